//! # DataSynergy Core
//!
//! Runtime-agnostic logic for DataSynergy: data source models, the
//! [`ServiceError`](error::ServiceError) taxonomy, the source store
//! abstraction, the advisory query optimizer, quality scoring and the local
//! natural-language responder.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Everything
//! that talks to the outside world lives in the `datasynergy` crate.

pub mod error;
pub mod models;
pub mod optimize;
pub mod quality;
pub mod responder;
pub mod store;

pub use error::{ConnectionFailure, Result, ServiceError};
