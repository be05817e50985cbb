//! [`MemoryTarget`] — an in-process stand-in for a MongoDB server.
//!
//! Mirrors the server behaviour the bootstrap depends on: duplicate users and
//! collections are errors, validators are enforced on insert, `_id` is
//! assigned when absent, and unique indexes reject repeated values (a missing
//! field counts as `null`). Used for dry runs and tests.

use std::{
  collections::BTreeMap,
  sync::{Mutex, MutexGuard},
};

use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use crate::{
  Error, Result,
  plan::{CollectionSpec, IndexSpec, Role, UserSpec},
  target::{CollectionInfo, ProvisionTarget, Snapshot, UserInfo},
  validator::JsonSchema,
};

const ID_INDEX: &str = "_id_";

#[derive(Debug, Default)]
struct Collection {
  validator: Option<(Document, JsonSchema)>,
  indexes:   Vec<IndexSpec>,
  documents: Vec<Document>,
}

impl Collection {
  /// The first document already holding `value` under `field`.
  fn holder(&self, field: &str, value: &Bson) -> Option<&Document> {
    self
      .documents
      .iter()
      .find(|doc| doc.get(field).unwrap_or(&Bson::Null) == value)
  }
}

#[derive(Debug, Default)]
struct State {
  /// Keyed by `(database, user)`.
  users:       BTreeMap<(String, String), Vec<Role>>,
  /// Keyed by namespace, `database.collection`.
  collections: BTreeMap<String, Collection>,
}

/// An in-memory provisioning target.
#[derive(Debug, Default)]
pub struct MemoryTarget {
  state: Mutex<State>,
}

impl MemoryTarget {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Insert a document the way the server would, returning its `_id`.
  ///
  /// The collection is created implicitly if it does not exist yet.
  pub fn insert(&self, database: &str, collection: &str, document: Document) -> Result<Bson> {
    let mut state = self.state();
    let coll = state.collections.entry(namespace(database, collection)).or_default();

    let document = if document.contains_key("_id") {
      document
    } else {
      let mut with_id = Document::new();
      with_id.insert("_id", ObjectId::new());
      for (key, value) in document {
        with_id.insert(key, value);
      }
      with_id
    };

    if let Some((_, schema)) = &coll.validator {
      let violations = schema.check(&document);
      if !violations.is_empty() {
        return Err(Error::DocumentValidation(violations));
      }
    }

    let id = document.get("_id").cloned().unwrap_or(Bson::Null);
    if coll.holder("_id", &id).is_some() {
      return Err(Error::DuplicateKey { index: ID_INDEX.into(), value: id });
    }

    for index in coll.indexes.iter().filter(|i| i.unique) {
      let value = document.get(&index.field).cloned().unwrap_or(Bson::Null);
      if coll.holder(&index.field, &value).is_some() {
        return Err(Error::DuplicateKey { index: index.name.clone(), value });
      }
    }

    coll.documents.push(document);
    Ok(id)
  }

  /// Number of documents stored in a collection.
  pub fn count(&self, database: &str, collection: &str) -> usize {
    self
      .state()
      .collections
      .get(&namespace(database, collection))
      .map_or(0, |c| c.documents.len())
  }

  fn do_create_user(&self, database: &str, user: &UserSpec) -> Result<()> {
    let mut state = self.state();
    let key = (database.to_owned(), user.name.clone());
    if state.users.contains_key(&key) {
      return Err(Error::UserExists {
        database: database.to_owned(),
        user:     user.name.clone(),
      });
    }
    debug!(database, user = %user.name, "memory: user created");
    state.users.insert(key, user.roles.clone());
    Ok(())
  }

  fn do_create_collection(&self, database: &str, spec: &CollectionSpec) -> Result<()> {
    let schema = JsonSchema::from_validator(&spec.validator)?;
    let mut state = self.state();
    let ns = namespace(database, &spec.name);
    if state.collections.contains_key(&ns) {
      return Err(Error::NamespaceExists(ns));
    }
    debug!(namespace = %ns, "memory: collection created");
    state.collections.insert(ns, Collection {
      validator: Some((spec.validator.clone(), schema)),
      ..Collection::default()
    });
    Ok(())
  }

  fn do_create_index(&self, database: &str, collection: &str, index: &IndexSpec) -> Result<()> {
    let mut state = self.state();
    let ns = namespace(database, collection);
    let coll = state.collections.entry(ns.clone()).or_default();

    if let Some(existing) = coll
      .indexes
      .iter()
      .find(|i| i.name == index.name || (i.field == index.field && i.direction == index.direction))
    {
      // Re-creating an identical index is a no-op on the server.
      if existing == index {
        return Ok(());
      }
      return Err(Error::IndexConflict { namespace: ns, name: index.name.clone() });
    }

    if index.unique {
      let mut seen: Vec<&Bson> = Vec::new();
      for doc in &coll.documents {
        let value = doc.get(&index.field).unwrap_or(&Bson::Null);
        if seen.contains(&value) {
          return Err(Error::DuplicateKey {
            index: index.name.clone(),
            value: value.clone(),
          });
        }
        seen.push(value);
      }
    }

    debug!(namespace = %ns, index = %index.name, "memory: index built");
    coll.indexes.push(index.clone());
    Ok(())
  }

  fn do_inspect(&self, database: &str, user: &str, collection: &str) -> Snapshot {
    let state = self.state();
    let coll = state.collections.get(&namespace(database, collection));
    Snapshot {
      user:       state
        .users
        .get(&(database.to_owned(), user.to_owned()))
        .map(|roles| UserInfo { name: user.to_owned(), roles: roles.clone() }),
      collection: coll.map(|c| CollectionInfo {
        name:      collection.to_owned(),
        validator: c.validator.as_ref().map(|(doc, _)| doc.clone()),
      }),
      indexes:    coll.map(|c| c.indexes.clone()).unwrap_or_default(),
    }
  }
}

impl ProvisionTarget for MemoryTarget {
  type Error = Error;

  async fn create_user<'a>(&'a self, database: &'a str, user: &'a UserSpec) -> Result<()> {
    self.do_create_user(database, user)
  }

  async fn create_collection<'a>(
    &'a self,
    database: &'a str,
    collection: &'a CollectionSpec,
  ) -> Result<()> {
    self.do_create_collection(database, collection)
  }

  async fn create_index<'a>(
    &'a self,
    database: &'a str,
    collection: &'a str,
    index: &'a IndexSpec,
  ) -> Result<()> {
    self.do_create_index(database, collection, index)
  }

  async fn inspect<'a>(
    &'a self,
    database: &'a str,
    user: &'a str,
    collection: &'a str,
  ) -> Result<Snapshot> {
    Ok(self.do_inspect(database, user, collection))
  }
}

fn namespace(database: &str, collection: &str) -> String {
  format!("{database}.{collection}")
}
