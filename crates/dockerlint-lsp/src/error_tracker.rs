//! Collects user-facing errors from a batch of validations so each
//! distinct message is shown once.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct ErrorTracker {
    seen: HashSet<String>,
    messages: Vec<String>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message`. Returns `false` if it was already recorded.
    pub fn add(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if !self.seen.insert(message.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Distinct messages in the order they were first seen.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
