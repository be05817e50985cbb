//! The `ProvisionTarget` trait and the snapshot it reports.
//!
//! Backends (`provision-mongo`, [`crate::memory`]) implement the trait. The
//! runner and the verifier only depend on this abstraction.

use std::future::Future;

use bson::Document;

use crate::plan::{CollectionSpec, IndexSpec, Role, UserSpec};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A user as the server reports it. Passwords are never read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
  pub name:  String,
  pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
  pub name:      String,
  pub validator: Option<Document>,
}

/// What currently exists in the target database, as far as the plan cares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  /// The planned user, if present.
  pub user:       Option<UserInfo>,
  /// The planned collection, if present.
  pub collection: Option<CollectionInfo>,
  /// Indexes on the planned collection, excluding the implicit `_id_`.
  pub indexes:    Vec<IndexSpec>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A server the plan can be applied to.
///
/// Each `create_*` call must fail if the object already exists with
/// incompatible options; the runner relies on that to refuse reruns.
pub trait ProvisionTarget: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create `user` in `database`. Fails if the user already exists.
  fn create_user<'a>(
    &'a self,
    database: &'a str,
    user: &'a UserSpec,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Create a collection with its validator attached. Fails if the
  /// collection already exists.
  fn create_collection<'a>(
    &'a self,
    database: &'a str,
    collection: &'a CollectionSpec,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Build an index. Fails on a conflicting definition or if existing
  /// documents violate a unique constraint.
  fn create_index<'a>(
    &'a self,
    database: &'a str,
    collection: &'a str,
    index: &'a IndexSpec,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read back the user, collection and indexes named by the arguments.
  fn inspect<'a>(
    &'a self,
    database: &'a str,
    user: &'a str,
    collection: &'a str,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + 'a;
}
