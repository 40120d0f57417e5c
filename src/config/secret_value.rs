// ABOUTME: Secret values for passwords and prompt answers in sshrun.yml.
// ABOUTME: Either a literal or a reference to an environment variable, resolved at use time.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl SecretValue {
    pub fn resolve(&self) -> Result<SecretString> {
        match self {
            SecretValue::Literal(s) => Ok(SecretString::new(s.clone())),
            SecretValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(SecretString::new(val)),
                Err(_) => default
                    .clone()
                    .map(SecretString::new)
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Literal(_) => f.write_str("Literal([REDACTED])"),
            SecretValue::FromEnv { var, .. } => f.debug_struct("FromEnv").field("var", var).finish(),
        }
    }
}
