//! Burnbox secret service.
//!
//! Production glue over [`burnbox_crypto`] and [`burnbox_store`]: the
//! burn-after-reading lifecycle, a background expiry sweeper, and the
//! `burnbox` operator binary.
//!
//! # Components
//!
//! - [`SecretService`]: create, read-and-burn, sweep, stats
//! - [`spawn_sweeper`]: periodic `sweep` on the tokio runtime
//! - [`ServiceError`]: client errors vs operational errors
//!
//! # Zero Knowledge
//!
//! The store only ever sees a lookup key and ciphertext. The identifier
//! returned from [`SecretService::create`] is the single copy of the
//! decryption parameters; losing it loses the secret.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod service;
mod sweeper;

pub use error::ServiceError;
pub use service::SecretService;
pub use sweeper::{SweeperConfig, SweeperHandle, spawn_sweeper};
