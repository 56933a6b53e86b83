// crates/types/src/daemon.rs
//! Replies of the daemon's informational endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::job::TransferStat;

/// `/core/version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Version {
    pub version: String,
    pub arch: String,
    pub os: String,
    pub go_version: String,
    pub go_tags: String,
    pub linking: String,
    pub is_beta: bool,
    pub is_git: bool,
}

impl Version {
    /// `"v1.65.0 (amd64)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.version, self.arch)
    }
}

/// `/operations/about`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct About {
    pub total: i64,
    pub used: i64,
    pub trashed: i64,
    pub other: i64,
    pub free: i64,
}

/// `/core/stats` as shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub bytes: i64,
    pub checks: i64,
    pub deleted_dirs: i64,
    pub deletes: i64,
    pub elapsed_time: f64,
    pub errors: i64,
    pub eta: Option<i64>,
    pub fatal_error: bool,
    pub renames: i64,
    pub retry_error: bool,
    pub speed: f64,
    pub total_bytes: i64,
    pub total_checks: i64,
    pub total_transfers: i64,
    pub transfer_time: f64,
    pub transferring: Option<Vec<TransferStat>>,
    pub transfers: i64,
}

/// One entry of `/mount/listmounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    #[serde(rename = "Fs")]
    pub fs: String,
    #[serde(rename = "MountPoint")]
    pub mount_point: String,
    #[serde(rename = "MountedOn", default)]
    pub mounted_on: Option<DateTime<Utc>>,
}

/// Output payload of `/operations/fsinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsDetail {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Root")]
    pub root: String,
    #[serde(rename = "String")]
    pub description: String,
    #[serde(rename = "Precision")]
    pub precision: i64,
    #[serde(rename = "Hashes")]
    pub hashes: Vec<String>,
    #[serde(rename = "Features")]
    pub features: BTreeMap<String, bool>,
}

impl FsDetail {
    /// Names of the supported features, sorted.
    pub fn feature_list(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// A storage backend from `/config/providers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Provider {
    pub name: String,
    pub description: String,
    /// Backend type used in a remote's `type` setting, e.g. `drive`.
    pub prefix: String,
    pub options: Vec<ProviderOption>,
}

impl Provider {
    /// Options a new remote of this type must be given.
    pub fn required_options(&self) -> impl Iterator<Item = &ProviderOption> {
        self.options.iter().filter(|o| o.required && !o.advanced)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProviderOption {
    pub name: String,
    pub help: String,
    pub provider: String,
    pub short_opt: String,
    pub hide: i64,
    pub required: bool,
    pub is_password: bool,
    pub no_prefix: bool,
    pub advanced: bool,
    pub exclusive: bool,
    pub default_str: String,
    pub value_str: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub examples: Option<Vec<OptionExample>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OptionExample {
    pub value: String,
    pub help: String,
    pub provider: String,
}

/// One dashboard refresh: connectivity plus whatever the daemon reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardInfo {
    pub connected: bool,
    pub version: Option<String>,
    pub bandwidth: Option<String>,
    pub stats: Option<DashboardStats>,
}
