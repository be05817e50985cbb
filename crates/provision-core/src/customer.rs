//! The customer record stored in the `customers` collection.

use bson::{Document, serde_helpers::chrono_datetime_as_bson_datetime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A customer document as the application writes it.
///
/// Timestamps are stored as BSON dates, the identifier as a BSON `long`,
/// which is what the collection validator expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  #[serde(rename = "_id")]
  pub id:         i64,
  pub name:       String,
  pub email:      String,
  pub cpf:        String,
  #[serde(with = "chrono_datetime_as_bson_datetime")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "chrono_datetime_as_bson_datetime")]
  pub updated_at: DateTime<Utc>,
}

impl Customer {
  /// Build a record with both timestamps set to now.
  pub fn new(
    id: i64,
    name: impl Into<String>,
    email: impl Into<String>,
    cpf: impl Into<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      id,
      name: name.into(),
      email: email.into(),
      cpf: cpf.into(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn to_document(&self) -> Result<Document> {
    Ok(bson::to_document(self)?)
  }
}
