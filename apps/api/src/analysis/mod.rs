// Profile analysis engine.
// Streaming path: context → headline → batched sections → job match → holistic,
// reported as progress events. Fallback path: the same analyses awaited whole.
// All LLM calls go through llm_client::Backends; no direct HTTP here.

pub mod batch;
pub mod context;
pub mod events;
pub mod fallback;
pub mod handlers;
pub mod merge;
pub mod orchestrator;
pub mod pipeline;
pub mod plan;
pub mod prompts;

use thiserror::Error;

use crate::config::Config;
use crate::llm_client::{Backends, LlmError};
use crate::models::analysis::Section;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Error in stream {index} ({section}): {source}")]
    SectionStream {
        section: Section,
        index: usize,
        #[source]
        source: LlmError,
    },

    /// The streaming consumer went away.
    #[error("Event channel closed")]
    EventChannelClosed,
}

/// Tuning knobs for one analyzer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Max section streams open at once on the streaming path.
    pub batch_size: usize,
    /// Job descriptions must be longer than this (chars, trimmed).
    pub job_description_min_len: usize,
    /// Chars of each section included in the holistic summary.
    pub holistic_prefix_chars: usize,
    /// Capacity of the progress-event channel.
    pub event_buffer: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            job_description_min_len: 50,
            holistic_prefix_chars: 200,
            event_buffer: 64,
        }
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.stream_batch_size,
            ..Self::default()
        }
    }
}

/// Runs profile analyses against a pair of backends. Cheap to clone.
#[derive(Clone)]
pub struct Analyzer {
    backends: Backends,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(backends: Backends, settings: AnalysisSettings) -> Self {
        Self { backends, settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }
}
