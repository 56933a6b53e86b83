// crates/operations/src/config.rs
//! Remote configuration under the internal `UI:Configuration` category.
//!
//! Providers are fetched once and cached per [`Config`]. Reading the
//! settings, saving and deleting a remote run as async daemon jobs and are
//! awaited through the engine like every other UI job.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rcview_client::{command, Command, InFlight, RcError};
use rcview_jobs::{JobEngine, JobRequest};
use rcview_types::Provider;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

pub const CONFIG_CATEGORY: &str = "UI:Configuration";

/// Settings of every configured remote, keyed by remote name.
pub type RemoteSettings = BTreeMap<String, Map<String, Value>>;

#[derive(Deserialize)]
struct ProvidersReply {
    #[serde(default)]
    providers: Vec<Provider>,
}

/// A remote to create or update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteConfig {
    pub name: String,
    /// Backend type (a provider prefix). Only sent on create.
    pub kind: String,
    pub parameters: Map<String, Value>,
    /// Let the daemon ask follow-up questions instead of failing.
    pub interactive: bool,
}

impl RemoteConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Set one `key=value` parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    fn to_command(&self, create: bool) -> Command {
        let mut parameters = self.parameters.clone();
        for reserved in ["name", "type", "configuration"] {
            parameters.remove(reserved);
        }

        let mut cmd = command(json!({
            "name": self.name,
            "parameters": parameters,
            "opt": { "nonInteractive": !self.interactive },
        }));
        if create {
            cmd.insert("type".to_string(), Value::String(self.kind.clone()));
        }
        cmd
    }
}

pub struct Config {
    engine: JobEngine,
    cancel: CancellationToken,
    providers: RwLock<Option<Vec<Provider>>>,
    save_guard: InFlight,
}

impl Config {
    pub fn new(engine: JobEngine, cancel: CancellationToken) -> Self {
        Self {
            engine,
            cancel,
            providers: RwLock::new(None),
            save_guard: InFlight::new("Saving configuration"),
        }
    }

    /// Storage backends the daemon knows, fetched on first use.
    pub async fn providers(&self) -> Result<Vec<Provider>, RcError> {
        let cached = match self.providers.read() {
            Ok(providers) => providers.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading providers: {e}");
                None
            }
        };
        if let Some(providers) = cached {
            return Ok(providers);
        }

        let reply: ProvidersReply = self
            .engine
            .send(&Command::new(), "/config/providers", &self.cancel)
            .await?
            .decode()?;

        match self.providers.write() {
            Ok(mut providers) => *providers = Some(reply.providers.clone()),
            Err(e) => tracing::error!("RwLock poisoned writing providers: {e}"),
        }
        Ok(reply.providers)
    }

    /// Provider whose prefix is exactly `kind`.
    pub async fn provider_by_type(&self, kind: &str) -> Result<Provider, RcError> {
        self.providers()
            .await?
            .into_iter()
            .find(|p| p.prefix == kind)
            .ok_or_else(|| RcError::Protocol("Could not find provider".to_string()))
    }

    /// First provider whose description contains `text`.
    pub async fn provider_by_description(&self, text: &str) -> Result<Provider, RcError> {
        self.providers()
            .await?
            .into_iter()
            .find(|p| p.description.contains(text))
            .ok_or_else(|| RcError::Protocol("Could not find provider".to_string()))
    }

    async fn run(&self, description: &str, endpoint: &str, command: Command) -> Result<Value, RcError> {
        let job = self
            .engine
            .submit(JobRequest::new(CONFIG_CATEGORY, description, endpoint, command))
            .await?;
        Ok(self.engine.await_reply(&job).await?.output)
    }

    /// Current settings of every configured remote.
    pub async fn settings(&self) -> Result<RemoteSettings, RcError> {
        let output = self
            .run("Getting configuration", "/config/dump", Command::new())
            .await?;
        if output.is_null() {
            return Ok(RemoteSettings::new());
        }
        Ok(serde_json::from_value(output)?)
    }

    pub async fn create(&self, remote: &RemoteConfig) -> Result<(), RcError> {
        self.save(remote, true).await
    }

    pub async fn update(&self, remote: &RemoteConfig) -> Result<(), RcError> {
        self.save(remote, false).await
    }

    /// Create or update `remote`. A second save while one is in flight
    /// fails with [`RcError::Busy`].
    pub async fn save(&self, remote: &RemoteConfig, create: bool) -> Result<(), RcError> {
        let _permit = self.save_guard.try_begin()?;

        let endpoint = if create { "/config/create" } else { "/config/update" };
        self.run(
            &format!("Save '{}'", remote.name),
            endpoint,
            remote.to_command(create),
        )
        .await?;

        tracing::info!(remote = %remote.name, create, "configuration saved");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), RcError> {
        self.run(
            &format!("Delete '{name}'"),
            "/config/delete",
            command(json!({ "name": name })),
        )
        .await?;
        tracing::info!(remote = %name, "configuration deleted");
        Ok(())
    }
}
