//! Clients for the external inference services.
//!
//! - [`GeminiClient`]: `generateContent` text and image+text calls
//! - [`TranscriptionClient`]: voice-track transcription and emotion analysis
//! - [`extract_validated_json`]: the single owner of output cleanup and
//!   per-task contract checks for anything a generative service returns
//!
//! The pipeline talks to these through the [`TextGenerator`],
//! [`VisionTagger`] and [`Transcriber`] traits.

pub mod config;
pub mod contract;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod provider;
pub mod transcribe;

pub use config::MlClientConfig;
pub use contract::TaskContract;
pub use error::{MlError, MlResult};
pub use extract::{clean_output, extract_validated_json, outermost_json};
pub use gemini::GeminiClient;
pub use provider::{TextGenerator, Transcriber, VisionTagger};
pub use transcribe::TranscriptionClient;
