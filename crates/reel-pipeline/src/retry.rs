//! Bounded generation retry.
//!
//! A generative call is attempted at most [`MAX_GENERATION_ATTEMPTS`] times.
//! The second attempt re-sends the prompt with an amendment forbidding any
//! preamble. Every failure is kept in an [`AttemptLog`] so the terminal error
//! carries the whole history.

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use reel_ml_client::{extract_validated_json, MlError, TaskContract, TextGenerator};

use crate::error::PipelineError;

pub const MAX_GENERATION_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub attempt: u32,
    pub reason: String,
}

/// Failure context accumulated across attempts.
#[derive(Debug, Clone)]
pub struct AttemptLog {
    task: &'static str,
    failures: Vec<AttemptFailure>,
}

impl AttemptLog {
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, attempt: u32, reason: impl Into<String>) {
        self.failures.push(AttemptFailure {
            attempt,
            reason: reason.into(),
        });
    }

    pub fn attempts(&self) -> u32 {
        self.failures.len() as u32
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("attempt {}: {}", f.attempt, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_error(self) -> PipelineError {
        PipelineError::GenerationExhausted {
            task: self.task,
            attempts: self.attempts(),
            summary: self.summary(),
        }
    }
}

/// Prompt used for the retry.
pub fn amend_prompt(prompt: &str, contract: TaskContract) -> String {
    format!(
        "{prompt}\n\nPREVIOUS OUTPUT WAS CHATTY OR INVALID. Respond with the {} JSON object only. \
         No preamble, no markdown, no commentary. START YOUR RESPONSE WITH '{}'.",
        contract.name(),
        contract.start_token()
    )
}

enum AttemptError {
    /// Worth another attempt
    Retryable(String),
    Fatal(MlError),
}

async fn attempt_once<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    contract: TaskContract,
    prompt: &str,
) -> Result<T, AttemptError> {
    let raw = match generator.generate(prompt).await {
        Ok(raw) => raw,
        Err(e) if e.is_transient() => return Err(AttemptError::Retryable(e.to_string())),
        Err(e) => return Err(AttemptError::Fatal(e)),
    };
    let value = extract_validated_json(&raw, contract)
        .map_err(|e| AttemptError::Retryable(e.to_string()))?;
    serde_json::from_value(value)
        .map_err(|e| AttemptError::Retryable(format!("schema mismatch: {e}")))
}

/// Generate, extract, validate and deserialize with one amended retry.
pub async fn run_with_contract<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    contract: TaskContract,
    prompt: &str,
) -> Result<T, PipelineError> {
    let mut log = AttemptLog::new(contract.name());
    let mut current = prompt.to_string();

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        match attempt_once::<T>(generator, contract, &current).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(task = contract.name(), attempt, "Generation recovered on retry");
                }
                return Ok(value);
            }
            Err(AttemptError::Fatal(e)) => {
                warn!(task = contract.name(), attempt, "Generation failed permanently: {}", e);
                return Err(e.into());
            }
            Err(AttemptError::Retryable(reason)) => {
                warn!(task = contract.name(), attempt, "Generation attempt rejected: {}", reason);
                log.record(attempt, reason);
                current = amend_prompt(prompt, contract);
            }
        }
    }

    Err(log.into_error())
}
