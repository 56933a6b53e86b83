// crates/cli/src/config.rs
//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rcview_jobs::{EngineConfig, SortMode};
use rcview_observability::LogConfig;

#[derive(Parser, Debug)]
#[command(name = "rcview")]
#[command(version, about = "Terminal front end for an rclone remote-control daemon", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Job status poll interval in milliseconds
    #[arg(long, env = "RCVIEW_POLL_MS", default_value_t = 1000, global = true)]
    pub poll_ms: u64,

    /// Directory for log files (defaults to the user cache dir)
    #[arg(long, env = "RCVIEW_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Daemon address, e.g. http://localhost:5572
    #[arg(long, env = "RCVIEW_HOST", default_value = "http://localhost:5572", global = true)]
    pub host: String,

    #[arg(long, env = "RCVIEW_USER", default_value = "", global = true)]
    pub user: String,

    #[arg(long, env = "RCVIEW_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check credentials and show the daemon version
    Login,
    /// List a directory, e.g. `gdrive:photos`
    Ls {
        target: String,
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Copy entries into a destination directory
    Cp {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<String>,
        destination: String,
        /// Print the destination listing once the batch is done
        #[arg(long)]
        show: bool,
    },
    /// Move entries into a destination directory
    Mv {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<String>,
        destination: String,
        #[arg(long)]
        show: bool,
    },
    /// Delete entries
    Rm {
        #[arg(required = true, num_args = 1..)]
        targets: Vec<String>,
    },
    /// Create a directory
    Mkdir { target: String },
    /// Print a public link for an entry
    Link { target: String },
    /// Show storage usage and backend features of a remote
    About { remote: String },
    /// List configured remotes
    Remotes,
    /// Manage mounts
    Mounts {
        #[command(subcommand)]
        action: MountCommands,
    },
    /// Inspect and edit remote configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Poll connectivity and transfer statistics
    Dashboard {
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum MountCommands {
    List,
    Add {
        fs: String,
        mount_point: String,
        #[arg(long)]
        mount_type: Option<String>,
        /// Extra FUSE flags, space separated
        #[arg(long)]
        extra_flags: Option<String>,
    },
    Remove { mount_point: String },
    RemoveAll,
    Types,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// List storage backends, or the options of one with --type
    Providers {
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Print the settings of all remotes, or of one
    Show { name: Option<String> },
    /// Create a remote from key=value parameters
    Create {
        name: String,
        #[arg(value_name = "TYPE")]
        kind: String,
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Let the daemon ask follow-up questions
        #[arg(long)]
        interactive: bool,
    },
    /// Change parameters of an existing remote
    Update {
        name: String,
        #[arg(required = true, value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Delete a remote
    Delete { name: String },
}

/// Parse `key=value`.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Modified,
}

impl From<SortKey> for SortMode {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Name => SortMode::Name,
            SortKey::Size => SortMode::Size,
            SortKey::Modified => SortMode::Modified,
        }
    }
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_millis(self.poll_ms.max(10)),
            ..Default::default()
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            dir: self.log_dir.clone(),
            json: self.json_logs,
            ..Default::default()
        }
    }
}

/// Split `remote:path` into the remote (`"remote:"`) and the path inside it.
/// Without a colon the argument is a local path rooted at `/`.
pub fn split_target(target: &str) -> (String, String) {
    match target.split_once(':') {
        Some((remote, path)) => (format!("{remote}:"), path.trim_matches('/').to_string()),
        None => ("/".to_string(), target.trim_matches('/').to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("gdrive:photos/2024/"), ("gdrive:".to_string(), "photos/2024".to_string()));
        assert_eq!(split_target("gdrive:"), ("gdrive:".to_string(), String::new()));
        assert_eq!(split_target("/tmp/x"), ("/".to_string(), "tmp/x".to_string()));
    }

    #[test]
    fn test_parse_copy() {
        let cli = Cli::parse_from(["rcview", "--poll-ms", "250", "cp", "a:x", "a:y", "b:dst"]);
        assert_eq!(cli.engine_config().poll_interval, Duration::from_millis(250));
        match cli.command {
            Commands::Cp { sources, destination, show } => {
                assert_eq!(sources, vec!["a:x", "a:y"]);
                assert_eq!(destination, "b:dst");
                assert!(!show);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_create() {
        let cli = Cli::parse_from(["rcview", "config", "create", "photos", "drive", "scope=drive", "root_folder_id="]);
        match cli.command {
            Commands::Config {
                action: ConfigCommands::Create { name, kind, params, interactive },
            } => {
                assert_eq!((name.as_str(), kind.as_str()), ("photos", "drive"));
                assert_eq!(
                    params,
                    vec![
                        ("scope".to_string(), "drive".to_string()),
                        ("root_folder_id".to_string(), String::new())
                    ]
                );
                assert!(!interactive);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["rcview", "config", "update", "photos", "novalue"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
