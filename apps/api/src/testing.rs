//! Scripted in-memory `TokenSource` for tests.
//!
//! Rules match on a substring of the system or user prompt; the first match
//! wins. Every call is recorded in order so tests can assert sequencing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::llm_client::{
    BackendKind, Backends, FragmentStream, GenerationRequest, LlmError, TokenSource,
};

const DEFAULT_RESPONSE: &str = "generated feedback";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub backend: BackendKind,
    pub system: String,
    pub prompt: String,
    pub streamed: bool,
}

#[derive(Debug, Clone)]
struct Rule {
    matcher: String,
    fragments: Vec<String>,
    fail_after: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    rules: Vec<Rule>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers with `text`, streamed word by word.
    pub fn respond(self, matcher: &str, text: &str) -> Self {
        let fragments = text.split_inclusive(' ').map(str::to_string).collect();
        self.rule(matcher, fragments, None)
    }

    pub fn respond_fragments(self, matcher: &str, fragments: &[&str]) -> Self {
        let fragments = fragments.iter().map(|f| f.to_string()).collect();
        self.rule(matcher, fragments, None)
    }

    /// Streams `fragments` and then fails. Whole-text calls fail outright.
    pub fn fail_after(self, matcher: &str, fragments: &[&str]) -> Self {
        let count = fragments.len();
        let fragments = fragments.iter().map(|f| f.to_string()).collect();
        self.rule(matcher, fragments, Some(count))
    }

    fn rule(mut self, matcher: &str, fragments: Vec<String>, fail_after: Option<usize>) -> Self {
        self.rules.push(Rule {
            matcher: matcher.to_string(),
            fragments,
            fail_after,
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, request: &GenerationRequest, streamed: bool) -> Rule {
        self.calls.lock().unwrap().push(RecordedCall {
            backend: request.backend,
            system: request.system.clone(),
            prompt: request.prompt.clone(),
            streamed,
        });
        self.rules
            .iter()
            .find(|r| request.system.contains(&r.matcher) || request.prompt.contains(&r.matcher))
            .cloned()
            .unwrap_or_else(|| Rule {
                matcher: String::new(),
                fragments: vec![DEFAULT_RESPONSE.to_string()],
                fail_after: None,
            })
    }
}

fn scripted_failure(matcher: &str) -> LlmError {
    LlmError::Api {
        status: 500,
        message: format!("scripted failure for '{matcher}'"),
    }
}

#[async_trait]
impl TokenSource for ScriptedSource {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let rule = self.record(request, false);
        if rule.fail_after.is_some() {
            return Err(scripted_failure(&rule.matcher));
        }
        Ok(rule.fragments.concat())
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        let rule = self.record(request, true);
        let mut items: Vec<Result<String, LlmError>> =
            rule.fragments.iter().cloned().map(Ok).collect();
        if let Some(after) = rule.fail_after {
            items.truncate(after);
            items.push(Err(scripted_failure(&rule.matcher)));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Wires one scripted source behind both backend kinds.
pub fn scripted_backends(source: ScriptedSource) -> (Backends, Arc<ScriptedSource>) {
    let source = Arc::new(source);
    let backends = Backends::new(source.clone(), source.clone());
    (backends, source)
}
