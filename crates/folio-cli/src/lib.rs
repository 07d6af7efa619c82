//! folio CLI Library
//!
//! Command-line access to the lifecycle controller and the Content API.

pub mod articles_cmd;
pub mod client;
pub mod config;
pub mod controller_cmd;
pub mod otp_cmd;
