//! Sequential execution of a [`Plan`] against a [`ProvisionTarget`].

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  plan::{Plan, Step},
  target::ProvisionTarget,
};

/// The step that failed, and why. Later steps were not attempted.
#[derive(Debug, Error)]
#[error("step `{step}` failed")]
pub struct ProvisionError<E: std::error::Error + 'static> {
  pub step:      Step,
  /// Steps that completed before the failure.
  pub completed: Vec<Step>,
  #[source]
  pub source:    E,
}

/// Steps applied by a successful run.
#[derive(Debug, Clone)]
pub struct Report {
  pub database:  String,
  pub completed: Vec<Step>,
}

/// Apply every step of `plan` in order, stopping at the first failure.
///
/// There is no rollback: a failure part-way leaves earlier steps applied.
pub async fn provision<T: ProvisionTarget>(
  target: &T,
  plan: &Plan,
) -> Result<Report, ProvisionError<T::Error>> {
  let mut completed = Vec::new();

  for step in plan.steps() {
    let started = Instant::now();
    let result = match &step {
      Step::UseDatabase { database } => {
        debug!(%database, "database is created on first write");
        Ok(())
      }
      Step::CreateUser { database, user } => target.create_user(database, user).await,
      Step::CreateCollection { database, collection } => {
        target.create_collection(database, collection).await
      }
      Step::CreateIndex { database, collection, index } => {
        target.create_index(database, collection, index).await
      }
    };

    match result {
      Ok(()) => {
        info!(%step, elapsed = ?started.elapsed(), "step completed");
        completed.push(step);
      }
      Err(source) => {
        error!(%step, error = %source, "step failed, aborting");
        return Err(ProvisionError { step, completed, source });
      }
    }
  }

  Ok(Report { database: plan.database.clone(), completed })
}
