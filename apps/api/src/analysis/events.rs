use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::analysis::{PersonaAnalysis, Section};

/// One unit of progress on the streaming path. Serialized as the `data:`
/// payload of an SSE block, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status {
        message: String,
    },
    PersonaStart {
        persona: String,
        current: usize,
        total: usize,
    },
    SectionStart {
        section: Section,
    },
    Stream {
        section: Section,
        chunk: String,
    },
    PersonaComplete {
        persona: String,
    },
    Complete {
        results: BTreeMap<String, PersonaAnalysis>,
    },
    Error {
        message: String,
        trigger_fallback: bool,
    },
}
