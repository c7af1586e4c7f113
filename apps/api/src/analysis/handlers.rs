//! Axum route handlers for the Analysis API.

use std::convert::Infallible;

use anyhow::anyhow;
use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::analysis::AnalysisResponse;
use crate::models::profile::Profile;
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

fn validate_profile(profile: &Profile) -> Result<(), AppError> {
    if profile.target_personas.iter().any(|p| p.trim().is_empty()) {
        return Err(AppError::Validation(
            "target_personas cannot contain empty persona ids".to_string(),
        ));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze-stream
///
/// Streams progress events as SSE `data:` blocks. The analysis runs in its
/// own task and stops when the client goes away. Failures arrive as a final
/// `error` event with `trigger_fallback: true`; the client should then retry
/// on `/analyze`.
pub async fn handle_analyze_stream(
    State(state): State<AppState>,
    Json(profile): Json<Profile>,
) -> Result<impl IntoResponse, AppError> {
    validate_profile(&profile)?;

    let analyzer = state.analyzer;
    let (tx, rx) = mpsc::channel(analyzer.settings().event_buffer);
    info!(
        "Streaming analysis requested for {} persona(s)",
        profile.personas().len()
    );

    tokio::spawn(async move {
        // Failures are already reported on the channel.
        let _ = analyzer.stream_analysis(&profile, &tx).await;
    });

    let events = ReceiverStream::new(rx).map(|event| match Event::default().json_data(&event) {
        Ok(sse) => Ok::<_, Infallible>(sse),
        Err(e) => {
            warn!("Dropping unserializable event: {e}");
            Ok(Event::default().comment("unserializable event"))
        }
    });

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(events),
    ))
}

/// POST /analyze
///
/// Non-streaming analysis: every persona, every section, one response.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(profile): Json<Profile>,
) -> Result<Json<AnalysisResponse>, AppError> {
    validate_profile(&profile)?;

    let analyzer = state.analyzer;
    let response = tokio::spawn(async move { analyzer.analyze(&profile).await })
        .await
        .map_err(|e| anyhow!("analysis task failed: {e}"))??;

    Ok(Json(response))
}
