//! [`MongoTarget`] — the MongoDB implementation of [`ProvisionTarget`].

use bson::{Document, doc};
use futures_util::TryStreamExt as _;
use mongodb::{Client, Database, options::ClientOptions};
use provision_core::{
  plan::{CollectionSpec, IndexSpec, UserSpec},
  target::{CollectionInfo, ProvisionTarget, Snapshot},
};
use tracing::{debug, info};

use crate::{
  MongoSettings, Result,
  convert::{create_user_command, index_model, index_spec, user_info},
};

/// A provisioning target backed by a live MongoDB deployment.
///
/// Cloning is cheap; the driver client is reference-counted.
#[derive(Clone)]
pub struct MongoTarget {
  client: Client,
}

impl MongoTarget {
  /// Connect and ping, so that an unreachable server fails fast instead of
  /// on the first provisioning step.
  pub async fn connect(settings: &MongoSettings) -> Result<Self> {
    info!(uri = %settings.redacted_uri(), "connecting to MongoDB");

    let mut options = ClientOptions::parse(&settings.uri).await?;
    options.app_name = Some(settings.app_name.clone());
    options.connect_timeout = Some(settings.connect_timeout());
    options.server_selection_timeout = Some(settings.server_selection_timeout());

    let client = Client::with_options(options)?;
    client.database("admin").run_command(doc! { "ping": 1 }).await?;

    info!("connected to MongoDB");
    Ok(Self { client })
  }

  pub fn from_client(client: Client) -> Self {
    Self { client }
  }

  pub fn database(&self, name: &str) -> Database {
    self.client.database(name)
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  async fn do_create_user(&self, database: &str, user: &UserSpec) -> Result<()> {
    self
      .database(database)
      .run_command(create_user_command(user))
      .await?;
    debug!(database, user = %user.name, "user created");
    Ok(())
  }

  async fn do_create_collection(&self, database: &str, spec: &CollectionSpec) -> Result<()> {
    self
      .database(database)
      .create_collection(&spec.name)
      .validator(spec.validator.clone())
      .await?;
    debug!(database, collection = %spec.name, "collection created");
    Ok(())
  }

  async fn do_create_index(
    &self,
    database: &str,
    collection: &str,
    index: &IndexSpec,
  ) -> Result<()> {
    let result = self
      .database(database)
      .collection::<Document>(collection)
      .create_index(index_model(index))
      .await?;
    debug!(database, collection, index = %result.index_name, "index built");
    Ok(())
  }

  async fn do_inspect(&self, database: &str, user: &str, collection: &str) -> Result<Snapshot> {
    let db = self.database(database);

    let reply = db
      .run_command(doc! { "usersInfo": { "user": user, "db": database } })
      .await?;
    let user = user_info(reply, user)?;

    let spec = db
      .list_collections()
      .filter(doc! { "name": collection })
      .await?
      .try_next()
      .await?;

    let Some(spec) = spec else {
      return Ok(Snapshot { user, collection: None, indexes: Vec::new() });
    };

    let indexes: Vec<_> = db
      .collection::<Document>(collection)
      .list_indexes()
      .await?
      .try_collect()
      .await?;

    Ok(Snapshot {
      user,
      collection: Some(CollectionInfo {
        name:      spec.name,
        validator: spec.options.validator,
      }),
      indexes: indexes.iter().filter_map(index_spec).collect(),
    })
  }
}

impl ProvisionTarget for MongoTarget {
  type Error = crate::Error;

  async fn create_user<'a>(&'a self, database: &'a str, user: &'a UserSpec) -> Result<()> {
    self.do_create_user(database, user).await
  }

  async fn create_collection<'a>(
    &'a self,
    database: &'a str,
    collection: &'a CollectionSpec,
  ) -> Result<()> {
    self.do_create_collection(database, collection).await
  }

  async fn create_index<'a>(
    &'a self,
    database: &'a str,
    collection: &'a str,
    index: &'a IndexSpec,
  ) -> Result<()> {
    self.do_create_index(database, collection, index).await
  }

  async fn inspect<'a>(
    &'a self,
    database: &'a str,
    user: &'a str,
    collection: &'a str,
  ) -> Result<Snapshot> {
    self.do_inspect(database, user, collection).await
  }
}
