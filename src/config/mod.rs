// ABOUTME: Configuration types and parsing for sshrun.yml.
// ABOUTME: Handles YAML parsing, host aliases, secrets and connection defaults.

mod host;
mod secret_value;

pub use host::HostConfig;
pub use secret_value::SecretValue;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::ssh::{BatchOptions, ConnectionParams, JoinPolicy, PromptResponder};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "sshrun.yml";
pub const CONFIG_FILENAME_ALT: &str = "sshrun.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".sshrun/config.yml";

/// Environment variable consulted when a host has no configured password.
pub const PASSWORD_ENV: &str = "SSHRUN_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    #[serde(default)]
    pub trust_first_connection: bool,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    #[serde(default)]
    pub join: JoinPolicy,

    #[serde(default)]
    pub prompts: Vec<PromptConfig>,

    #[serde(default)]
    pub hosts: HashMap<String, HostEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub prompt: String,
    pub response: SecretValue,
}

/// A host in the config, either `user@host:port` or a detailed mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HostEntry {
    Simple(String),
    Detailed(HostConfig),
}

impl HostEntry {
    fn into_host_config(self) -> std::result::Result<HostConfig, String> {
        match self {
            HostEntry::Simple(s) => HostConfig::parse(&s),
            HostEntry::Detailed(c) => {
                // The address may carry its own `user@`; an explicit user wins
                let parsed = HostConfig::parse(&c.address)?;
                Ok(HostConfig {
                    address: parsed.address,
                    user: c.user.or(parsed.user),
                    password: c.password,
                })
            }
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            known_hosts: None,
            trust_first_connection: false,
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
            join: JoinPolicy::default(),
            prompts: Vec::new(),
            hosts: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`Config::discover`], but an absent file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Look up a host alias, or parse `target` as `[user@]host[:port]`.
    pub fn host(&self, target: &str) -> Result<HostConfig> {
        if let Some(entry) = self.hosts.get(target) {
            return entry
                .clone()
                .into_host_config()
                .map_err(|e| Error::InvalidConfig(format!("host {}: {}", target, e)));
        }
        HostConfig::parse(target).map_err(|e| Error::UnknownHost(format!("{}: {}", target, e)))
    }

    /// Build connection parameters for `target`.
    ///
    /// The user falls back to `$USER`; the password to `$SSHRUN_PASSWORD`.
    pub fn connection_params(&self, target: &str) -> Result<ConnectionParams> {
        let host = self.host(target)?;

        let user = host
            .user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));

        let password = match &host.password {
            Some(value) => value.resolve()?,
            None => std::env::var(PASSWORD_ENV)
                .map(SecretString::new)
                .map_err(|_| Error::MissingPassword(target.to_string()))?,
        };

        let mut params = ConnectionParams::configure(host.address, user, password)
            .trust_on_first_use(self.trust_first_connection)
            .connect_timeout(self.connect_timeout)
            .command_timeout(self.command_timeout);
        if let Some(path) = &self.known_hosts {
            params = params.known_hosts_path(path);
        }
        Ok(params)
    }

    /// Batch options carrying the configured join policy and prompt answers.
    ///
    /// Prompts whose answer cannot be resolved are left out and reported.
    pub fn batch_options(&self, diag: &mut Diagnostics) -> BatchOptions {
        let mut options = BatchOptions::default().join(self.join);
        for prompt in &self.prompts {
            match prompt.response.resolve() {
                Ok(response) => {
                    options = options.respond(PromptResponder::new(prompt.prompt.clone(), response));
                }
                Err(e) => diag.warn(Warning::prompt_skipped(format!(
                    "not answering prompt {:?}: {}",
                    prompt.prompt, e
                ))),
            }
        }
        options
    }
}
