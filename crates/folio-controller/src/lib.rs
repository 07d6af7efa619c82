//! folio lifecycle controller
//!
//! Owns the Content API child process: reaps stale listeners on its port,
//! spawns it, waits for it to answer, and stops it on request.

pub mod probe;
pub mod reaper;
pub mod server;
pub mod supervisor;
