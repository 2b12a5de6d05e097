//! Structured operation logging.
//!
//! Every line goes to `tracing` with the operation context attached; lines
//! meant for the user are mirrored onto the [`LogChannel`].

use tracing::{error, info, warn, Span};

use crate::log_channel::LogChannel;

#[derive(Debug, Clone)]
pub struct JobLogger {
    subject: String,
    operation: String,
    channel: Option<LogChannel>,
}

impl JobLogger {
    /// * `subject` - what the operation works on (render id, file name)
    /// * `operation` - e.g. "ingest", "render", "compile"
    pub fn new(subject: impl Into<String>, operation: &str) -> Self {
        Self {
            subject: subject.into(),
            operation: operation.to_string(),
            channel: None,
        }
    }

    /// Mirror user-visible lines onto `channel`.
    pub fn with_channel(mut self, channel: LogChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    fn mirror(&self, line: String, is_error: bool) {
        if let Some(channel) = &self.channel {
            if is_error {
                channel.error(line);
            } else {
                channel.log(line);
            }
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            subject = %self.subject,
            operation = %self.operation,
            "Started: {}", message
        );
        self.mirror(format!("[{}] {}", self.operation, message), false);
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            subject = %self.subject,
            operation = %self.operation,
            "Progress: {}", message
        );
        self.mirror(format!("[{}] {}", self.operation, message), false);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            subject = %self.subject,
            operation = %self.operation,
            "Warning: {}", message
        );
        self.mirror(format!("[{}] warning: {}", self.operation, message), false);
    }

    pub fn log_error(&self, message: &str) {
        error!(
            subject = %self.subject,
            operation = %self.operation,
            "Error: {}", message
        );
        self.mirror(format!("[{}] {}", self.operation, message), true);
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            subject = %self.subject,
            operation = %self.operation,
            "Completed: {}", message
        );
        self.mirror(format!("[{}] done: {}", self.operation, message), false);
    }

    /// Plain line for the observers only, e.g. forwarded process output.
    pub fn relay(&self, line: &str) {
        tracing::debug!(subject = %self.subject, "{}", line);
        self.mirror(line.to_string(), false);
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "op",
            subject = %self.subject,
            operation = %self.operation
        )
    }
}
