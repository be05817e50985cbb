//! Core types for provisioning the customer database.
//!
//! Holds the fixed provisioning [`plan::Plan`], the `$jsonSchema` evaluator
//! used to reason about the collection validator offline, and the
//! [`target::ProvisionTarget`] trait that concrete backends implement.
//! Nothing here talks to a network.

pub mod customer;
pub mod error;
pub mod memory;
pub mod plan;
pub mod run;
pub mod target;
pub mod validator;
pub mod verify;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
