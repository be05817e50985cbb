//! Connection settings.

use std::time::Duration;

use serde::Deserialize;

/// How to reach the server. The plan itself is not configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
  /// Connection string, including admin credentials when auth is enabled.
  pub uri:                           String,
  pub connect_timeout_secs:          u64,
  pub server_selection_timeout_secs: u64,
  pub app_name:                      String,
}

impl Default for MongoSettings {
  fn default() -> Self {
    Self {
      uri:                           "mongodb://localhost:27017".into(),
      connect_timeout_secs:          10,
      server_selection_timeout_secs: 10,
      app_name:                      "mongo-init".into(),
    }
  }
}

impl MongoSettings {
  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.connect_timeout_secs)
  }

  pub fn server_selection_timeout(&self) -> Duration {
    Duration::from_secs(self.server_selection_timeout_secs)
  }

  /// The URI with any password replaced, for logging.
  pub fn redacted_uri(&self) -> String {
    let Some((scheme, rest)) = self.uri.split_once("://") else {
      return self.uri.clone();
    };
    // Credentials end at the last '@' before the host list.
    let host_start = rest.find('/').unwrap_or(rest.len());
    match rest[..host_start].rfind('@') {
      Some(at) => {
        let user = rest[..at].split(':').next().unwrap_or_default();
        format!("{scheme}://{user}:***@{}", &rest[at + 1..])
      }
      None => self.uri.clone(),
    }
  }
}
