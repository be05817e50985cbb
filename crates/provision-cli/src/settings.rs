//! Connection settings: defaults, then TOML file, then environment, then CLI.

use std::path::Path;

use anyhow::Context as _;
use provision_mongo::MongoSettings;

pub const ENV_PREFIX: &str = "MONGO_INIT";

pub fn load(path: &Path, uri: Option<String>) -> anyhow::Result<MongoSettings> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    .set_override_option("uri", uri)
    .context("invalid --uri")?
    .build()
    .with_context(|| format!("failed to read config file {}", path.display()))?;

  settings
    .try_deserialize()
    .context("failed to deserialise connection settings")
}
