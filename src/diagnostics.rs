// ABOUTME: Diagnostics accumulator for non-fatal warnings during a remote run.
// ABOUTME: Collects warnings that shouldn't fail the command but should be shown to users.

/// Collects non-fatal warnings during remote operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a remote operation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }

    /// Create a prompt configuration warning.
    pub fn prompt_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::PromptSkipped,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to cleanly disconnect the SSH transport.
    SshDisconnect,
    /// A configured prompt answer could not be resolved and was left out.
    PromptSkipped,
}
