//! The provisioning plan: what gets created, in which order.
//!
//! Every name, credential and schema rule here is a fixed literal. Only the
//! connection to the server is configurable; the plan itself is not.

use std::fmt;

use bson::{Document, doc};
use serde::Serialize;

// ─── Literals ────────────────────────────────────────────────────────────────

pub const DATABASE: &str = "fastfood_10soat_g22_tc4";
pub const APP_USER: &str = "app_user";
pub const APP_PASSWORD: &str = "app_password";
pub const CUSTOMERS: &str = "customers";

pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
pub const CPF_PATTERN: &str =
  r"^[0-9]{11}$|^[0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2}$";

/// Printed to stdout once every step has succeeded.
pub const COMPLETION_MESSAGE: &str = "MongoDB initialization completed successfully";

// ─── Specs ───────────────────────────────────────────────────────────────────

/// A built-in role granted on a single database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
  pub role: String,
  pub db:   String,
}

impl Role {
  pub fn read_write(db: impl Into<String>) -> Self {
    Self { role: "readWrite".into(), db: db.into() }
  }
}

/// An application user to create in the target database.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSpec {
  pub name:     String,
  pub password: String,
  pub roles:    Vec<Role>,
}

impl fmt::Debug for UserSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserSpec")
      .field("name", &self.name)
      .field("password", &"<redacted>")
      .field("roles", &self.roles)
      .finish()
  }
}

/// A collection together with the validator attached at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
  pub name:      String,
  pub validator: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Ascending,
  Descending,
}

impl Direction {
  pub fn as_i32(self) -> i32 {
    match self {
      Direction::Ascending => 1,
      Direction::Descending => -1,
    }
  }

  /// Interpret a key-pattern value as the server reports it (`1`, `1.0`,
  /// `NumberLong(1)`, ...). Non-numeric values such as `"text"` yield `None`.
  pub fn from_bson(value: &bson::Bson) -> Option<Self> {
    let n = match value {
      bson::Bson::Int32(n) => f64::from(*n),
      bson::Bson::Int64(n) => *n as f64,
      bson::Bson::Double(n) => *n,
      _ => return None,
    };
    if n > 0.0 {
      Some(Direction::Ascending)
    } else if n < 0.0 {
      Some(Direction::Descending)
    } else {
      None
    }
  }
}

/// A single-field index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
  pub name:      String,
  pub field:     String,
  pub direction: Direction,
  pub unique:    bool,
}

impl IndexSpec {
  /// An ascending unique index named the way the server names it by
  /// default (`<field>_1`).
  pub fn ascending_unique(field: impl Into<String>) -> Self {
    let field = field.into();
    Self {
      name: format!("{field}_1"),
      field,
      direction: Direction::Ascending,
      unique: true,
    }
  }

  /// The key pattern document, e.g. `{ "cpf": 1 }`.
  pub fn keys(&self) -> Document {
    let mut keys = Document::new();
    keys.insert(self.field.clone(), self.direction.as_i32());
    keys
  }
}

// ─── Validator ───────────────────────────────────────────────────────────────

/// The `$jsonSchema` validator attached to the customers collection.
pub fn customers_validator() -> Document {
  doc! {
    "$jsonSchema": {
      "bsonType": "object",
      "required": ["name", "email", "cpf", "created_at", "updated_at"],
      "properties": {
        "_id": {
          "bsonType": "long",
          "description": "must be a long and is required",
        },
        "name": {
          "bsonType": "string",
          "description": "must be a string and is required",
        },
        "email": {
          "bsonType": "string",
          "pattern": EMAIL_PATTERN,
          "description": "must be a valid email address and is required",
        },
        "cpf": {
          "bsonType": "string",
          "pattern": CPF_PATTERN,
          "description": "must be a valid CPF format and is required",
        },
        "created_at": {
          "bsonType": "date",
          "description": "must be a date and is required",
        },
        "updated_at": {
          "bsonType": "date",
          "description": "must be a date and is required",
        },
      },
    }
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Everything the bootstrap creates.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
  pub database:   String,
  pub user:       UserSpec,
  pub collection: CollectionSpec,
  pub indexes:    Vec<IndexSpec>,
}

impl Plan {
  /// The customer database plan.
  pub fn customers() -> Self {
    Self {
      database:   DATABASE.into(),
      user:       UserSpec {
        name:     APP_USER.into(),
        password: APP_PASSWORD.into(),
        roles:    vec![Role::read_write(DATABASE)],
      },
      collection: CollectionSpec {
        name:      CUSTOMERS.into(),
        validator: customers_validator(),
      },
      indexes:    vec![
        IndexSpec::ascending_unique("cpf"),
        IndexSpec::ascending_unique("email"),
      ],
    }
  }

  /// The steps in execution order.
  pub fn steps(&self) -> Vec<Step> {
    let mut steps = vec![
      Step::UseDatabase { database: self.database.clone() },
      Step::CreateUser {
        database: self.database.clone(),
        user:     self.user.clone(),
      },
      Step::CreateCollection {
        database:   self.database.clone(),
        collection: self.collection.clone(),
      },
    ];
    steps.extend(self.indexes.iter().map(|index| Step::CreateIndex {
      database:   self.database.clone(),
      collection: self.collection.name.clone(),
      index:      index.clone(),
    }));
    steps
  }
}

/// One unit of work. Steps run strictly in the order [`Plan::steps`] returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  /// Select the database. It is created implicitly by the first write.
  UseDatabase { database: String },
  CreateUser { database: String, user: UserSpec },
  CreateCollection { database: String, collection: CollectionSpec },
  CreateIndex { database: String, collection: String, index: IndexSpec },
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Step::UseDatabase { database } => write!(f, "use database {database}"),
      Step::CreateUser { database, user } => {
        write!(f, "create user {}@{database}", user.name)
      }
      Step::CreateCollection { database, collection } => {
        write!(f, "create collection {database}.{}", collection.name)
      }
      Step::CreateIndex { database, collection, index } => write!(
        f,
        "create {}index {} on {database}.{collection}",
        if index.unique { "unique " } else { "" },
        index.name,
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use bson::Bson;

  use super::*;

  #[test]
  fn steps_run_in_script_order() {
    let steps: Vec<String> =
      Plan::customers().steps().iter().map(ToString::to_string).collect();
    assert_eq!(steps, vec![
      "use database fastfood_10soat_g22_tc4",
      "create user app_user@fastfood_10soat_g22_tc4",
      "create collection fastfood_10soat_g22_tc4.customers",
      "create unique index cpf_1 on fastfood_10soat_g22_tc4.customers",
      "create unique index email_1 on fastfood_10soat_g22_tc4.customers",
    ]);
  }

  #[test]
  fn user_is_scoped_to_target_database() {
    let plan = Plan::customers();
    assert_eq!(plan.user.roles, vec![Role {
      role: "readWrite".into(),
      db:   DATABASE.into(),
    }]);
  }

  #[test]
  fn debug_output_hides_password() {
    let rendered = format!("{:?}", Plan::customers().user);
    assert!(!rendered.contains(APP_PASSWORD));
    assert!(rendered.contains("<redacted>"));
  }

  #[test]
  fn validator_lists_required_fields() {
    let validator = customers_validator();
    let schema = validator.get_document("$jsonSchema").unwrap();
    let required: Vec<&str> = schema
      .get_array("required")
      .unwrap()
      .iter()
      .filter_map(Bson::as_str)
      .collect();
    assert_eq!(required, ["name", "email", "cpf", "created_at", "updated_at"]);
  }

  #[test]
  fn index_keys_are_ascending() {
    let index = IndexSpec::ascending_unique("email");
    assert_eq!(index.name, "email_1");
    assert_eq!(index.keys(), doc! { "email": 1 });
  }

  #[test]
  fn direction_accepts_any_numeric_encoding() {
    assert_eq!(Direction::from_bson(&Bson::Double(1.0)), Some(Direction::Ascending));
    assert_eq!(Direction::from_bson(&Bson::Int64(-1)), Some(Direction::Descending));
    assert_eq!(Direction::from_bson(&Bson::String("text".into())), None);
  }
}
