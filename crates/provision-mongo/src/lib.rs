//! MongoDB backend for the customer database bootstrap.
//!
//! [`MongoTarget`] implements [`ProvisionTarget`](provision_core::target::ProvisionTarget)
//! on top of the official `mongodb` driver. One client, one connection pool,
//! used strictly sequentially by the runner.

mod convert;
mod settings;
mod target;

pub mod error;

pub use error::{Error, Result};
pub use settings::MongoSettings;
pub use target::MongoTarget;
