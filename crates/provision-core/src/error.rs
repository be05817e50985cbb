//! Error types for `provision-core`.

use bson::Bson;
use thiserror::Error;

use crate::validator::Violation;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid validator: {0}")]
  InvalidSchema(String),

  #[error("unsupported $jsonSchema keyword: {0:?}")]
  UnsupportedKeyword(String),

  #[error("invalid pattern {pattern:?}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source:  regex::Error,
  },

  #[error("user {user:?} already exists in database {database:?}")]
  UserExists { database: String, user: String },

  #[error("collection already exists: {0}")]
  NamespaceExists(String),

  #[error("index {name:?} conflicts with an existing index on {namespace}")]
  IndexConflict { namespace: String, name: String },

  #[error("document failed validation: {}", join_violations(.0))]
  DocumentValidation(Vec<Violation>),

  #[error("duplicate key on index {index:?}: {value}")]
  DuplicateKey { index: String, value: Bson },

  #[error("bson serialization error: {0}")]
  Bson(#[from] bson::ser::Error),
}

fn join_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
