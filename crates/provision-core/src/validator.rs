//! Offline evaluation of `$jsonSchema` collection validators.
//!
//! Only the keywords the customer validator uses are understood: `bsonType`,
//! `required`, `properties`, `pattern`, plus the annotations `description`
//! and `title`. Anything else is rejected at compile time so that a schema
//! is never silently half-enforced.

use std::fmt;

use bson::{Bson, Document};
use regex::Regex;

use crate::{Error, Result};

// ─── BSON types ──────────────────────────────────────────────────────────────

/// A `bsonType` alias as accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonType {
  Double,
  String,
  Object,
  Array,
  BinData,
  ObjectId,
  Bool,
  Date,
  Null,
  Regex,
  Int,
  Timestamp,
  Long,
  Decimal,
  /// Matches `int`, `long`, `double` and `decimal`.
  Number,
}

impl BsonType {
  pub fn parse(alias: &str) -> Option<Self> {
    Some(match alias {
      "double" => BsonType::Double,
      "string" => BsonType::String,
      "object" => BsonType::Object,
      "array" => BsonType::Array,
      "binData" => BsonType::BinData,
      "objectId" => BsonType::ObjectId,
      "bool" => BsonType::Bool,
      "date" => BsonType::Date,
      "null" => BsonType::Null,
      "regex" => BsonType::Regex,
      "int" => BsonType::Int,
      "timestamp" => BsonType::Timestamp,
      "long" => BsonType::Long,
      "decimal" => BsonType::Decimal,
      "number" => BsonType::Number,
      _ => return None,
    })
  }

  pub fn matches(self, value: &Bson) -> bool {
    match self {
      BsonType::Number => matches!(
        value,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)
      ),
      other => alias_of(value) == other.alias(),
    }
  }

  pub fn alias(self) -> &'static str {
    match self {
      BsonType::Double => "double",
      BsonType::String => "string",
      BsonType::Object => "object",
      BsonType::Array => "array",
      BsonType::BinData => "binData",
      BsonType::ObjectId => "objectId",
      BsonType::Bool => "bool",
      BsonType::Date => "date",
      BsonType::Null => "null",
      BsonType::Regex => "regex",
      BsonType::Int => "int",
      BsonType::Timestamp => "timestamp",
      BsonType::Long => "long",
      BsonType::Decimal => "decimal",
      BsonType::Number => "number",
    }
  }
}

/// The `bsonType` alias of a concrete value.
pub fn alias_of(value: &Bson) -> &'static str {
  match value {
    Bson::Double(_) => "double",
    Bson::String(_) => "string",
    Bson::Document(_) => "object",
    Bson::Array(_) => "array",
    Bson::Binary(_) => "binData",
    Bson::ObjectId(_) => "objectId",
    Bson::Boolean(_) => "bool",
    Bson::DateTime(_) => "date",
    Bson::Null => "null",
    Bson::RegularExpression(_) => "regex",
    Bson::Int32(_) => "int",
    Bson::Timestamp(_) => "timestamp",
    Bson::Int64(_) => "long",
    Bson::Decimal128(_) => "decimal",
    Bson::Undefined => "undefined",
    Bson::MinKey => "minKey",
    Bson::MaxKey => "maxKey",
    Bson::JavaScriptCode(_) => "javascript",
    Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
    Bson::Symbol(_) => "symbol",
    Bson::DbPointer(_) => "dbPointer",
  }
}

// ─── Violations ──────────────────────────────────────────────────────────────

/// Why a document was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
  Missing,
  WrongType { expected: Vec<&'static str>, found: &'static str },
  PatternMismatch { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  /// Dotted path of the offending field; empty for the document itself.
  pub path: String,
  pub kind: ViolationKind,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path = if self.path.is_empty() { "<document>" } else { &self.path };
    match &self.kind {
      ViolationKind::Missing => write!(f, "{path}: required field is missing"),
      ViolationKind::WrongType { expected, found } => {
        write!(f, "{path}: expected {}, found {found}", expected.join(" or "))
      }
      ViolationKind::PatternMismatch { pattern } => {
        write!(f, "{path}: does not match /{pattern}/")
      }
    }
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// A compiled `$jsonSchema` node.
#[derive(Debug, Clone, Default)]
pub struct JsonSchema {
  bson_types: Option<Vec<BsonType>>,
  required:   Vec<String>,
  properties: Vec<(String, JsonSchema)>,
  pattern:    Option<Regex>,
}

impl JsonSchema {
  /// Compile a collection validator of the form `{ "$jsonSchema": { .. } }`.
  pub fn from_validator(validator: &Document) -> Result<Self> {
    let mut schema = None;
    for (key, value) in validator {
      match (key.as_str(), value) {
        ("$jsonSchema", Bson::Document(inner)) => schema = Some(Self::compile(inner)?),
        ("$jsonSchema", other) => {
          return Err(Error::InvalidSchema(format!(
            "$jsonSchema must be an object, found {}",
            alias_of(other)
          )));
        }
        (other, _) => return Err(Error::UnsupportedKeyword(other.to_owned())),
      }
    }
    schema.ok_or_else(|| Error::InvalidSchema("missing $jsonSchema".into()))
  }

  /// Compile a single schema node.
  pub fn compile(schema: &Document) -> Result<Self> {
    let mut out = JsonSchema::default();

    for (key, value) in schema {
      match key.as_str() {
        "bsonType" => out.bson_types = Some(compile_bson_type(value)?),
        "required" => out.required = compile_required(value)?,
        "properties" => {
          let Bson::Document(props) = value else {
            return Err(Error::InvalidSchema("properties must be an object".into()));
          };
          for (name, sub) in props {
            let Bson::Document(sub) = sub else {
              return Err(Error::InvalidSchema(format!(
                "schema for property {name:?} must be an object"
              )));
            };
            out.properties.push((name.clone(), Self::compile(sub)?));
          }
        }
        "pattern" => {
          let Bson::String(pattern) = value else {
            return Err(Error::InvalidSchema("pattern must be a string".into()));
          };
          let regex = Regex::new(pattern).map_err(|source| Error::Pattern {
            pattern: pattern.clone(),
            source,
          })?;
          out.pattern = Some(regex);
        }
        "description" | "title" => {}
        other => return Err(Error::UnsupportedKeyword(other.to_owned())),
      }
    }

    Ok(out)
  }

  /// Check a whole document, returning every violation found.
  pub fn check(&self, document: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();
    self.check_document("", document, &mut violations);
    violations
  }

  pub fn is_valid(&self, document: &Document) -> bool {
    self.check(document).is_empty()
  }

  fn check_value(&self, path: &str, value: &Bson, out: &mut Vec<Violation>) {
    if let Some(types) = &self.bson_types
      && !types.iter().any(|t| t.matches(value))
    {
      out.push(Violation {
        path: path.to_owned(),
        kind: ViolationKind::WrongType {
          expected: types.iter().map(|t| t.alias()).collect(),
          found:    alias_of(value),
        },
      });
      return;
    }

    // `pattern` only constrains strings, `required`/`properties` only objects.
    match value {
      Bson::String(s) => {
        if let Some(pattern) = &self.pattern
          && !pattern.is_match(s)
        {
          out.push(Violation {
            path: path.to_owned(),
            kind: ViolationKind::PatternMismatch {
              pattern: pattern.as_str().to_owned(),
            },
          });
        }
      }
      Bson::Document(doc) => self.check_document(path, doc, out),
      _ => {}
    }
  }

  fn check_document(&self, path: &str, doc: &Document, out: &mut Vec<Violation>) {
    if let Some(types) = &self.bson_types
      && path.is_empty()
      && !types.contains(&BsonType::Object)
    {
      out.push(Violation {
        path: String::new(),
        kind: ViolationKind::WrongType {
          expected: types.iter().map(|t| t.alias()).collect(),
          found:    "object",
        },
      });
      return;
    }

    for field in &self.required {
      if !doc.contains_key(field) {
        out.push(Violation {
          path: join(path, field),
          kind: ViolationKind::Missing,
        });
      }
    }

    for (name, sub) in &self.properties {
      if let Some(value) = doc.get(name) {
        sub.check_value(&join(path, name), value, out);
      }
    }
  }
}

fn compile_bson_type(value: &Bson) -> Result<Vec<BsonType>> {
  let aliases: Vec<&str> = match value {
    Bson::String(s) => vec![s.as_str()],
    Bson::Array(items) => items
      .iter()
      .map(|item| {
        item
          .as_str()
          .ok_or_else(|| Error::InvalidSchema("bsonType entries must be strings".into()))
      })
      .collect::<Result<_>>()?,
    _ => return Err(Error::InvalidSchema("bsonType must be a string or array".into())),
  };

  aliases
    .into_iter()
    .map(|alias| {
      BsonType::parse(alias)
        .ok_or_else(|| Error::InvalidSchema(format!("unknown bsonType {alias:?}")))
    })
    .collect()
}

fn compile_required(value: &Bson) -> Result<Vec<String>> {
  let Bson::Array(items) = value else {
    return Err(Error::InvalidSchema("required must be an array".into()));
  };
  items
    .iter()
    .map(|item| {
      item
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::InvalidSchema("required entries must be strings".into()))
    })
    .collect()
}

fn join(path: &str, field: &str) -> String {
  if path.is_empty() {
    field.to_owned()
  } else {
    format!("{path}.{field}")
  }
}
