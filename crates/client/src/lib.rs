// crates/client/src/lib.rs
//! Remote-control daemon client.
//!
//! Provides:
//! - `RcClient` / `Dispatch`: send one command, read one reply
//! - `SessionRegistry`: logged-in hosts, the current host, login limiter
//! - `dashboard`: connectivity and stats pollers

pub mod client;
pub mod dashboard;
pub mod error;
pub mod session;

pub use client::{command, Command, Dispatch, RcClient, RcResponse, REQUEST_TIMEOUT};
pub use error::RcError;
pub use session::{InFlight, SessionRegistry};
