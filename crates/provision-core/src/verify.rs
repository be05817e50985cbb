//! Compare what a server reports against the plan.

use std::fmt;

use crate::{
  plan::{IndexSpec, Plan, Role},
  target::Snapshot,
};

/// One way in which the server differs from the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Drift {
  MissingUser { user: String },
  RolesMismatch { user: String, expected: Vec<Role>, found: Vec<Role> },
  MissingCollection { collection: String },
  MissingValidator { collection: String },
  ValidatorMismatch { collection: String },
  MissingIndex { index: String },
  IndexMismatch { expected: IndexSpec, found: IndexSpec },
}

impl fmt::Display for Drift {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Drift::MissingUser { user } => write!(f, "user {user} does not exist"),
      Drift::RolesMismatch { user, expected, found } => write!(
        f,
        "user {user} has roles [{}], expected [{}]",
        render_roles(found),
        render_roles(expected),
      ),
      Drift::MissingCollection { collection } => {
        write!(f, "collection {collection} does not exist")
      }
      Drift::MissingValidator { collection } => {
        write!(f, "collection {collection} has no validator")
      }
      Drift::ValidatorMismatch { collection } => {
        write!(f, "collection {collection} has a different validator")
      }
      Drift::MissingIndex { index } => write!(f, "index {index} does not exist"),
      Drift::IndexMismatch { expected, found } => write!(
        f,
        "index on {} is {} (unique: {}), expected {} (unique: {})",
        expected.field, found.name, found.unique, expected.name, expected.unique,
      ),
    }
  }
}

fn render_roles(roles: &[Role]) -> String {
  roles
    .iter()
    .map(|r| format!("{}@{}", r.role, r.db))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Every difference between `plan` and `snapshot`; empty when provisioned.
pub fn verify(plan: &Plan, snapshot: &Snapshot) -> Vec<Drift> {
  let mut drift = Vec::new();

  match &snapshot.user {
    None => drift.push(Drift::MissingUser { user: plan.user.name.clone() }),
    Some(user) => {
      let mut expected = plan.user.roles.clone();
      let mut found = user.roles.clone();
      expected.sort_by(|a, b| (&a.db, &a.role).cmp(&(&b.db, &b.role)));
      found.sort_by(|a, b| (&a.db, &a.role).cmp(&(&b.db, &b.role)));
      if expected != found {
        drift.push(Drift::RolesMismatch { user: user.name.clone(), expected, found });
      }
    }
  }

  let name = &plan.collection.name;
  match &snapshot.collection {
    None => drift.push(Drift::MissingCollection { collection: name.clone() }),
    Some(info) => match &info.validator {
      None => drift.push(Drift::MissingValidator { collection: name.clone() }),
      Some(v) if *v != plan.collection.validator => {
        drift.push(Drift::ValidatorMismatch { collection: name.clone() })
      }
      Some(_) => {}
    },
  }

  // Indexes are matched on their key, not their name.
  for expected in &plan.indexes {
    match snapshot.indexes.iter().find(|i| i.field == expected.field) {
      None => drift.push(Drift::MissingIndex { index: expected.name.clone() }),
      Some(found) if found != expected => drift.push(Drift::IndexMismatch {
        expected: expected.clone(),
        found:    found.clone(),
      }),
      Some(_) => {}
    }
  }

  drift
}
