// crates/operations/src/mounts.rs
//! Mount management under the internal `UI:Mounts` category.

use rcview_client::{command, Command, RcError};
use rcview_jobs::{JobEngine, JobRequest};
use rcview_types::MountPoint;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

pub const MOUNTS_CATEGORY: &str = "UI:Mounts";

/// Mount options given as one space-separated string that the daemon
/// expects as a list.
const SPLIT_OPTIONS: [&str; 2] = ["ExtraFlags", "ExtraOptions"];

/// Parameters of `/mount/mount`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountRequest {
    pub fs: String,
    pub mount_point: String,
    pub mount_type: Option<String>,
    pub mount_opt: Map<String, Value>,
    pub vfs_opt: Map<String, Value>,
}

impl MountRequest {
    pub fn new(fs: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            fs: fs.into(),
            mount_point: mount_point.into(),
            ..Default::default()
        }
    }

    fn to_command(&self) -> Command {
        let mut cmd = command(json!({ "fs": self.fs, "mountPoint": self.mount_point }));
        if let Some(kind) = &self.mount_type {
            cmd.insert("mountType".to_string(), Value::String(kind.clone()));
        }
        if !self.mount_opt.is_empty() {
            let mut opts = self.mount_opt.clone();
            split_extras(&mut opts);
            cmd.insert("mountOpt".to_string(), Value::Object(opts));
        }
        if !self.vfs_opt.is_empty() {
            cmd.insert("vfsOpt".to_string(), Value::Object(self.vfs_opt.clone()));
        }
        cmd
    }
}

fn split_extras(opts: &mut Map<String, Value>) {
    for key in SPLIT_OPTIONS {
        if let Some(Value::String(raw)) = opts.get(key) {
            let parts: Vec<Value> = raw
                .split_whitespace()
                .map(|p| Value::String(p.to_string()))
                .collect();
            opts.insert(key.to_string(), Value::Array(parts));
        }
    }
}

#[derive(Deserialize)]
struct MountsReply {
    #[serde(rename = "mountPoints", default)]
    mount_points: Option<Vec<MountPoint>>,
}

pub struct Mounts {
    engine: JobEngine,
    cancel: CancellationToken,
}

impl Mounts {
    pub fn new(engine: JobEngine, cancel: CancellationToken) -> Self {
        Self { engine, cancel }
    }

    async fn run(&self, description: &str, endpoint: &str, command: Command) -> Result<(), RcError> {
        let job = self
            .engine
            .submit(JobRequest::new(MOUNTS_CATEGORY, description, endpoint, command))
            .await?;
        self.engine.await_reply(&job).await?;
        Ok(())
    }

    pub async fn mount(&self, request: &MountRequest) -> Result<(), RcError> {
        self.run("Mounting remote", "/mount/mount", request.to_command()).await?;
        tracing::info!(fs = %request.fs, mount_point = %request.mount_point, "mounted");
        Ok(())
    }

    pub async fn unmount(&self, mount_point: &str) -> Result<(), RcError> {
        self.run(
            "Unmounting mountpoint",
            "/mount/unmount",
            command(json!({ "mountPoint": mount_point })),
        )
        .await?;
        tracing::info!(%mount_point, "unmounted");
        Ok(())
    }

    pub async fn unmount_all(&self) -> Result<(), RcError> {
        self.run("Unmounting all mountpoints", "/mount/unmountall", Command::new())
            .await
    }

    pub async fn list_mounts(&self) -> Result<Vec<MountPoint>, RcError> {
        let reply: MountsReply = self
            .engine
            .send(&Command::new(), "/mount/listmounts", &self.cancel)
            .await?
            .decode()?;
        Ok(reply.mount_points.unwrap_or_default())
    }

    /// Mount implementations the daemon supports, e.g. `mount`, `cmount`.
    pub async fn mount_types(&self) -> Result<Vec<String>, RcError> {
        crate::remote::string_list(&self.engine, "/mount/types", "mountTypes", &self.cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mount_command_splits_extra_flags() {
        let mut request = MountRequest::new("gdrive:", "/mnt/gdrive");
        request.mount_type = Some("cmount".to_string());
        request.mount_opt.insert("ExtraFlags".to_string(), json!("--allow-other  -o ro"));
        request.mount_opt.insert("AllowOther".to_string(), json!(true));

        assert_eq!(
            Value::Object(request.to_command()),
            json!({
                "fs": "gdrive:",
                "mountPoint": "/mnt/gdrive",
                "mountType": "cmount",
                "mountOpt": {"ExtraFlags": ["--allow-other", "-o", "ro"], "AllowOther": true}
            })
        );
    }

    #[test]
    fn test_minimal_mount_command() {
        let request = MountRequest::new("s3:bucket", "/mnt/s3");
        assert_eq!(
            Value::Object(request.to_command()),
            json!({"fs": "s3:bucket", "mountPoint": "/mnt/s3"})
        );
    }
}
