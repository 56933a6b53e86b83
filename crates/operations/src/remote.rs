// crates/operations/src/remote.rs
//! Synchronous informational calls.

use rcview_client::{command, Command, RcError};
use rcview_jobs::JobEngine;
use rcview_types::About;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Storage usage of a remote.
pub async fn about(engine: &JobEngine, fs: &str, cancel: &CancellationToken) -> Result<About, RcError> {
    engine
        .send(&command(json!({ "fs": fs })), "/operations/about", cancel)
        .await?
        .decode()
}

/// Names of the configured remotes.
pub async fn list_remotes(engine: &JobEngine, cancel: &CancellationToken) -> Result<Vec<String>, RcError> {
    string_list(engine, "/config/listremotes", "remotes", cancel).await
}

/// Call `endpoint` without parameters and read the string array under `key`.
pub(crate) async fn string_list(
    engine: &JobEngine,
    endpoint: &str,
    key: &str,
    cancel: &CancellationToken,
) -> Result<Vec<String>, RcError> {
    let reply: Value = engine.send(&Command::new(), endpoint, cancel).await?.decode()?;

    let values = reply
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| RcError::Protocol(format!("{endpoint}: reply has no '{key}' list")))?;

    Ok(values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}
