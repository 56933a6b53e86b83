// crates/operations/src/lib.rs
//! Single-shot remote operations built on the job engine.

pub mod config;
pub mod explorer;
pub mod mounts;
pub mod remote;

pub use config::{Config, RemoteConfig, RemoteSettings, CONFIG_CATEGORY};
pub use explorer::{clean_path, list_path, Explorer, Listing};
pub use mounts::{MountRequest, Mounts, MOUNTS_CATEGORY};
