//! Error type for `provision-mongo`.

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("mongodb error: {0}")]
  Mongo(#[from] mongodb::error::Error),

  #[error("failed to decode server reply: {0}")]
  Decode(#[from] bson::de::Error),

  #[error("unexpected server reply: {0}")]
  UnexpectedReply(String),
}

impl Error {
  /// The server error code, when the server rejected a command or write.
  ///
  /// `48` namespace exists, `51003` user exists, `85`/`86` index conflict,
  /// `11000` duplicate key, `121` document failed validation.
  pub fn server_code(&self) -> Option<i32> {
    let Error::Mongo(e) = self else { return None };
    match e.kind.as_ref() {
      ErrorKind::Command(c) => Some(c.code),
      ErrorKind::Write(WriteFailure::WriteError(w)) => Some(w.code),
      ErrorKind::Write(WriteFailure::WriteConcernError(w)) => Some(w.code),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
