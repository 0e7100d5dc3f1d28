//! API clients for external services
//!
//! - Server: file listing and HLS stream preparation

pub mod server;

pub use server::{ApiError, CinematorClient, PrepareOutcome};
