// ABOUTME: Host entries for SSH connections.
// ABOUTME: Parses targets like "host", "user@host", "host:port", "user@host:port".

use super::secret_value::SecretValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Address in `host` or `host:port` form.
    pub address: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<SecretValue>,
}

impl HostConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host address cannot be empty".to_string());
        }

        // Parse format: [user@]address
        let (user, address) = match s.rsplit_once('@') {
            Some((user, address)) => (Some(user), address),
            None => (None, s),
        };

        if user.is_some_and(str::is_empty) {
            return Err("user cannot be empty".to_string());
        }

        // Validate eagerly so typos fail before any connection attempt
        crate::ssh::split_address(address).map_err(|e| e.to_string())?;

        Ok(HostConfig {
            address: address.to_string(),
            user: user.map(|s| s.to_string()),
            password: None,
        })
    }
}
