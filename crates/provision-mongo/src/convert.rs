//! Translation between plan types and driver/server representations.

use bson::{Bson, Document, doc};
use mongodb::{IndexModel, options::IndexOptions};
use provision_core::{
  plan::{Direction, IndexSpec, Role, UserSpec},
  target::UserInfo,
};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// The `createUser` command for `user`.
pub(crate) fn create_user_command(user: &UserSpec) -> Document {
  let roles: Vec<Bson> = user
    .roles
    .iter()
    .map(|r| Bson::Document(doc! { "role": r.role.as_str(), "db": r.db.as_str() }))
    .collect();
  doc! {
    "createUser": user.name.as_str(),
    "pwd": user.password.as_str(),
    "roles": roles,
  }
}

pub(crate) fn index_model(index: &IndexSpec) -> IndexModel {
  IndexModel::builder()
    .keys(index.keys())
    .options(Some(
      IndexOptions::builder()
        .name(index.name.clone())
        .unique(index.unique)
        .build(),
    ))
    .build()
}

/// Read a server index back as a single-field [`IndexSpec`].
///
/// Returns `None` for the implicit `_id_` index and for compound or special
/// (text, hashed, ...) indexes, which the plan never creates.
pub(crate) fn index_spec(model: &IndexModel) -> Option<IndexSpec> {
  let options = model.options.as_ref();
  let name = options.and_then(|o| o.name.clone());
  if name.as_deref() == Some("_id_") {
    return None;
  }

  let mut keys = model.keys.iter();
  let (Some((field, value)), None) = (keys.next(), keys.next()) else {
    debug!(keys = %model.keys, "skipping compound index");
    return None;
  };
  let Some(direction) = Direction::from_bson(value) else {
    debug!(keys = %model.keys, "skipping non-directional index");
    return None;
  };

  Some(IndexSpec {
    name: name.unwrap_or_else(|| format!("{field}_{}", direction.as_i32())),
    field: field.clone(),
    direction,
    unique: options.and_then(|o| o.unique).unwrap_or(false),
  })
}

#[derive(Deserialize)]
struct UsersInfoReply {
  users: Vec<UserEntry>,
}

#[derive(Deserialize)]
struct UserEntry {
  user:  String,
  #[serde(default)]
  roles: Vec<RoleEntry>,
}

#[derive(Deserialize)]
struct RoleEntry {
  role: String,
  db:   String,
}

/// Extract `user` from a `usersInfo` reply.
pub(crate) fn user_info(reply: Document, user: &str) -> Result<Option<UserInfo>> {
  let reply: UsersInfoReply = bson::from_document(reply)?;
  let mut matching = reply.users.into_iter().filter(|u| u.user == user);
  let found = matching.next();
  if matching.next().is_some() {
    return Err(Error::UnexpectedReply(format!(
      "usersInfo returned more than one entry for {user:?}"
    )));
  }
  Ok(found.map(|entry| UserInfo {
    name:  entry.user,
    roles: entry
      .roles
      .into_iter()
      .map(|r| Role { role: r.role, db: r.db })
      .collect(),
  }))
}
