use crate::analysis::Analyzer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Wraps both LLM backends and the analysis settings built from `Config`.
    pub analyzer: Analyzer,
}
