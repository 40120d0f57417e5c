// ABOUTME: Host key trust policy backed by an OpenSSH known_hosts file.
// ABOUTME: Resolved before dialing; fails closed on unreadable or malformed stores.

use super::error::{Error, Result};
use russh::keys::known_hosts::{check_known_hosts_path, learn_known_hosts_path};
use russh::keys::{HashAlg, ssh_key};
use std::path::{Path, PathBuf};

/// Path of the user's known_hosts file, following the OpenSSH convention.
pub fn default_known_hosts_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| Error::TrustStore {
        path: PathBuf::from("~/.ssh/known_hosts"),
        reason: "HOME not set".to_string(),
    })?;
    Ok(PathBuf::from(home).join(".ssh").join("known_hosts"))
}

/// A validated known_hosts store plus the policy for unknown hosts.
#[derive(Debug, Clone)]
pub struct TrustStore {
    path: PathBuf,
    trust_on_first_use: bool,
    present: bool,
    entries: usize,
}

impl TrustStore {
    /// Load and validate the store at `path` (or the default location).
    ///
    /// A missing file is only acceptable with trust-on-first-use, in which
    /// case it is created when the first key is learned.
    pub fn resolve(path: Option<&Path>, trust_on_first_use: bool) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_known_hosts_path()?,
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && trust_on_first_use => {
                tracing::debug!(path = %path.display(), "known_hosts missing, will learn keys");
                return Ok(Self {
                    path,
                    trust_on_first_use,
                    present: false,
                    entries: 0,
                });
            }
            Err(e) => {
                return Err(Error::TrustStore {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let entries = count_entries(&content).map_err(|reason| Error::TrustStore {
            path: path.clone(),
            reason,
        })?;

        tracing::debug!(path = %path.display(), entries, "known_hosts resolved");

        Ok(Self {
            path,
            trust_on_first_use,
            present: true,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of host entries in the store when it was resolved.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn trust_on_first_use(&self) -> bool {
        self.trust_on_first_use
    }

    /// Check a server key. Unknown keys are learned when trust-on-first-use
    /// is enabled and rejected otherwise; changed keys are always rejected.
    pub fn verify(&self, host: &str, port: u16, key: &ssh_key::PublicKey) -> Result<()> {
        let known = if self.present {
            match check_known_hosts_path(host, port, key, &self.path) {
                Ok(known) => known,
                Err(russh::keys::Error::KeyChanged { line }) => {
                    tracing::warn!(host, port, line, "host key mismatch");
                    return Err(Error::HostKeyMismatch {
                        host: host.to_string(),
                        port,
                        line,
                    });
                }
                Err(e) => {
                    return Err(Error::TrustStore {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        } else {
            false
        };

        if known {
            tracing::debug!(host, port, "host key verified");
            return Ok(());
        }

        if !self.trust_on_first_use {
            return Err(Error::UnknownHostKey {
                host: host.to_string(),
                port,
            });
        }

        tracing::warn!(
            "Trust-On-First-Use: accepting unknown host key {} for {}:{}",
            key.fingerprint(HashAlg::Sha256),
            host,
            port
        );
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!("Failed to create {}: {}", parent.display(), e);
        }
        if let Err(e) = learn_known_hosts_path(host, port, key, &self.path) {
            tracing::warn!("Failed to save host key to known_hosts: {}", e);
        }
        Ok(())
    }
}

/// Count host lines, rejecting lines that cannot be known_hosts entries.
fn count_entries(content: &str) -> std::result::Result<usize, String> {
    let mut entries = 0;
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = line.split_whitespace().count();
        // Marker lines carry an extra leading field.
        let required = if line.starts_with('@') { 4 } else { 3 };
        if fields < required {
            return Err(format!("malformed entry on line {}", idx + 1));
        }
        entries += 1;
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIH4EqPAqDsK+N2jQ21C/jxHgbw8jYtGipSUdM2hsNmrH";
    const OTHER_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIISSCbjYdatridZSUq9v+Aj084pncqh00jurWYGniUPG";
    const ENTRY: &str = "example.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIH4EqPAqDsK+N2jQ21C/jxHgbw8jYtGipSUdM2hsNmrH";

    fn key(openssh: &str) -> ssh_key::PublicKey {
        ssh_key::PublicKey::from_openssh(openssh).unwrap()
    }

    fn store_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn counts_entries_and_skips_comments() {
        let file = store_with(&format!("# comment\n\n{ENTRY}\n{ENTRY}\n"));
        let store = TrustStore::resolve(Some(file.path()), false).unwrap();
        assert_eq!(store.entries(), 2);
        assert!(!store.trust_on_first_use());
    }

    #[test]
    fn accepts_marker_lines() {
        let file = store_with(&format!("@cert-authority {ENTRY}\n"));
        let store = TrustStore::resolve(Some(file.path()), false).unwrap();
        assert_eq!(store.entries(), 1);
    }

    #[test]
    fn malformed_line_fails_closed() {
        let file = store_with("example.com ssh-ed25519\n");
        let err = TrustStore::resolve(Some(file.path()), true).unwrap_err();
        assert!(
            matches!(err, Error::TrustStore { ref reason, .. } if reason.contains("line 1")),
            "expected TrustStore error, got: {:?}",
            err
        );
    }

    #[test]
    fn missing_store_is_an_error_without_tofu() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        let err = TrustStore::resolve(Some(&path), false).unwrap_err();
        assert!(matches!(err, Error::TrustStore { .. }));
    }

    #[test]
    fn missing_store_is_allowed_with_tofu() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        let store = TrustStore::resolve(Some(&path), true).unwrap();
        assert_eq!(store.entries(), 0);
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn known_key_is_accepted() {
        let file = store_with(&format!("{ENTRY}\n"));
        let store = TrustStore::resolve(Some(file.path()), false).unwrap();
        store.verify("example.com", 22, &key(KEY)).unwrap();
    }

    #[test]
    fn unknown_host_is_rejected_without_tofu() {
        let file = store_with(&format!("{ENTRY}\n"));
        let store = TrustStore::resolve(Some(file.path()), false).unwrap();

        let err = store.verify("other.example.com", 22, &key(KEY)).unwrap_err();

        assert!(
            matches!(err, Error::UnknownHostKey { ref host, port: 22 } if host == "other.example.com"),
            "expected UnknownHostKey, got: {:?}",
            err
        );
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(!content.contains("other.example.com"), "key must not be learned");
    }

    #[test]
    fn changed_key_is_rejected() {
        for tofu in [false, true] {
            let file = store_with(&format!("{ENTRY}\n"));
            let store = TrustStore::resolve(Some(file.path()), tofu).unwrap();

            let err = store.verify("example.com", 22, &key(OTHER_KEY)).unwrap_err();

            assert!(
                matches!(err, Error::HostKeyMismatch { ref host, port: 22, .. } if host == "example.com"),
                "tofu={}: expected HostKeyMismatch, got: {:?}",
                tofu,
                err
            );
        }
    }

    #[test]
    fn tofu_learns_key_into_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ssh").join("known_hosts");

        let store = TrustStore::resolve(Some(&path), true).unwrap();
        store.verify("example.net", 2222, &key(KEY)).unwrap();
        assert!(path.exists(), "known_hosts should be created");

        // A later strict connection trusts the learned key and no other
        let strict = TrustStore::resolve(Some(&path), false).unwrap();
        assert_eq!(strict.entries(), 1);
        strict.verify("example.net", 2222, &key(KEY)).unwrap();
        let err = strict
            .verify("example.net", 2222, &key(OTHER_KEY))
            .unwrap_err();
        assert!(matches!(err, Error::HostKeyMismatch { .. }), "got: {:?}", err);
    }

    #[test]
    fn default_path_follows_home() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(
                default_known_hosts_path().unwrap(),
                PathBuf::from("/home/tester/.ssh/known_hosts")
            );
        });
    }
}
