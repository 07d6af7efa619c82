//! folio Content API Library
//!
//! Core functionality for the ephemeral Content API:
//! - In-memory OTP and session store with injected clock and randomness
//! - SMTP delivery of one-time codes
//! - Flat-file JSON article repository
//! - axum router exposing the OTP flow and article CRUD

pub mod articles;
pub mod auth;
pub mod server;
