//! `folio` Core Library
//!
//! Shared functionality for the folio publications backend:
//! - Article model, slug derivation and read-time estimate
//! - JSON envelopes exchanged by the Content API, the controller and the CLI
//! - Configuration defaults and validation
//! - Wall-clock abstraction used by expiring stores
//! - Common error types, tracing setup and shutdown signalling

pub mod article;
pub mod clock;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod tracing_init;
pub mod wire;

pub use article::{Article, ArticleDraft};
pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
