// ABOUTME: Automatic answers to interactive prompts seen in remote output.
// ABOUTME: Scans the current output line and replies once per prompt occurrence.

use secrecy::{ExposeSecret, SecretString};

/// Reply `response` followed by a newline whenever the current output line
/// contains `prompt`.
#[derive(Debug)]
pub struct PromptResponder {
    prompt: String,
    response: SecretString,
}

impl PromptResponder {
    pub fn new(prompt: impl Into<String>, response: SecretString) -> Self {
        Self {
            prompt: prompt.into(),
            response,
        }
    }

    /// Responder for sudo's password prompt.
    pub fn sudo(password: SecretString) -> Self {
        Self::new("[sudo] password for", password)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Tracks the tail of the line being written by the remote side, never
/// longer than the longest prompt.
#[derive(Debug, Default)]
pub(crate) struct LineScanner {
    line: Vec<u8>,
}

impl LineScanner {
    /// Feed output bytes, returning replies to send in order.
    pub(crate) fn feed(&mut self, data: &[u8], responders: &[PromptResponder]) -> Vec<Vec<u8>> {
        let mut replies = Vec::new();
        let Some(limit) = responders.iter().map(|r| r.prompt.len().max(1)).max() else {
            return replies;
        };
        for &byte in data {
            if byte == b'\n' {
                self.line.clear();
                continue;
            }
            if self.line.len() >= limit {
                let excess = self.line.len() + 1 - limit;
                self.line.drain(..excess);
            }
            self.line.push(byte);
            if let Some(responder) = responders
                .iter()
                .find(|r| self.line.ends_with(r.prompt.as_bytes()))
            {
                tracing::debug!(prompt = %responder.prompt, "answering prompt");
                let mut reply = responder.response.expose_secret().as_bytes().to_vec();
                reply.push(b'\n');
                replies.push(reply);
                // One reply per occurrence
                self.line.clear();
            }
        }
        replies
    }
}
