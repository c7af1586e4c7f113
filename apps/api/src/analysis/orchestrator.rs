//! Streaming orchestrator: runs every persona's stages in order and reports
//! each unit of progress as a `ProgressEvent`.
//!
//! Per persona, strictly sequential:
//!   1. context (whole-text call)
//!   2. headline, on its own
//!   3. the six remaining profile sections, in batches
//!   4. job match, only with qualifying job descriptions
//!   5. holistic meta-analysis over a prefix of everything above
//!
//! Any failure ends the run with one `error` event that tells the client to
//! retry on the non-streaming endpoint. Personas are never isolated from each
//! other's failures.

use std::collections::{BTreeMap, BTreeSet};

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::batch::run_batched;
use crate::analysis::context::determine_user_context;
use crate::analysis::events::ProgressEvent;
use crate::analysis::pipeline::SectionPipeline;
use crate::analysis::plan::{holistic_request, job_match_requests, profile_section_plan};
use crate::analysis::{AnalysisError, Analyzer};
use crate::models::analysis::{PersonaAnalysis, Section, SectionTexts};
use crate::models::profile::Profile;

type EventSender = mpsc::Sender<ProgressEvent>;

async fn emit(events: &EventSender, event: ProgressEvent) -> Result<(), AnalysisError> {
    events
        .send(event)
        .await
        .map_err(|_| AnalysisError::EventChannelClosed)
}

impl Analyzer {
    /// Streams the full analysis of `profile` into `events`.
    ///
    /// On failure the error is reported as a terminal `error` event (unless the
    /// receiver is already gone) and also returned.
    pub async fn stream_analysis(
        &self,
        profile: &Profile,
        events: &EventSender,
    ) -> Result<(), AnalysisError> {
        let span = info_span!("stream_analysis", run_id = %Uuid::new_v4());

        async move {
            let outcome = self.run_stream(profile, events).await;
            match &outcome {
                Ok(()) => info!("Streaming analysis complete"),
                Err(AnalysisError::EventChannelClosed) => {
                    warn!("Event consumer disconnected, analysis abandoned")
                }
                Err(e) => {
                    error!("Streaming analysis failed: {e}");
                    let event = ProgressEvent::Error {
                        message: e.to_string(),
                        trigger_fallback: true,
                    };
                    if emit(events, event).await.is_err() {
                        warn!("Could not deliver error event, consumer is gone");
                    }
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stream(&self, profile: &Profile, events: &EventSender) -> Result<(), AnalysisError> {
        let personas = profile.personas();
        let total = personas.len();
        emit(
            events,
            ProgressEvent::Status {
                message: format!("Starting analysis for {total} persona(s)"),
            },
        )
        .await?;

        let mut results = BTreeMap::new();
        for (i, persona) in personas.into_iter().enumerate() {
            emit(
                events,
                ProgressEvent::PersonaStart {
                    persona: persona.clone(),
                    current: i + 1,
                    total,
                },
            )
            .await?;

            let analysis = self
                .stream_persona(profile, &persona, events)
                .instrument(info_span!("persona", persona = %persona))
                .await?;

            emit(
                events,
                ProgressEvent::PersonaComplete {
                    persona: persona.clone(),
                },
            )
            .await?;
            results.insert(persona, analysis);
        }

        emit(events, ProgressEvent::Complete { results }).await
    }

    async fn stream_persona(
        &self,
        profile: &Profile,
        persona: &str,
        events: &EventSender,
    ) -> Result<PersonaAnalysis, AnalysisError> {
        let context = determine_user_context(profile, persona, &self.backends).await?;
        let mut texts = SectionTexts::new();

        // Headline
        if let Some(plan) = profile_section_plan(Section::Headline, profile, &context) {
            emit(
                events,
                ProgressEvent::SectionStart {
                    section: Section::Headline,
                },
            )
            .await?;
            let pipeline = SectionPipeline::from_plan(Section::Headline, plan, &self.backends);
            forward(pipeline, &mut texts, events).await?;
        }

        // Batched profile sections
        let pipelines: Vec<SectionPipeline> = Section::PARALLEL
            .into_iter()
            .filter_map(|section| {
                profile_section_plan(section, profile, &context)
                    .map(|plan| SectionPipeline::from_plan(section, plan, &self.backends))
            })
            .collect();
        info!(
            "Streaming {} sections in batches of {}",
            pipelines.len(),
            self.settings.batch_size
        );
        // Every planned section is summarized, even one that streams nothing.
        for pipeline in &pipelines {
            texts.set(pipeline.section(), String::new());
        }
        let mut started = BTreeSet::new();
        let mut batched = run_batched(pipelines, self.settings.batch_size);
        while let Some(item) = batched.next().await {
            let item = item?;
            if started.insert(item.section) {
                debug!(
                    "Section '{}' producing (batch {}, slot {})",
                    item.section,
                    item.batch + 1,
                    item.local_index
                );
                emit(
                    events,
                    ProgressEvent::SectionStart {
                        section: item.section,
                    },
                )
                .await?;
            }
            texts.append(item.section, &item.fragment);
            emit(
                events,
                ProgressEvent::Stream {
                    section: item.section,
                    chunk: item.fragment,
                },
            )
            .await?;
        }

        // Job match
        let descriptions = profile.valid_job_descriptions(self.settings.job_description_min_len);
        if descriptions.is_empty() {
            debug!("No qualifying job descriptions, skipping job match");
        } else {
            info!("Matching against {} job description(s)", descriptions.len());
            emit(
                events,
                ProgressEvent::SectionStart {
                    section: Section::JobMatch,
                },
            )
            .await?;
            let requests = job_match_requests(profile, &context, &descriptions);
            forward(
                SectionPipeline::job_match(requests, &self.backends),
                &mut texts,
                events,
            )
            .await?;
        }

        // Holistic
        emit(
            events,
            ProgressEvent::SectionStart {
                section: Section::Holistic,
            },
        )
        .await?;
        let request = holistic_request(&texts, &context, self.settings.holistic_prefix_chars);
        let pipeline = SectionPipeline::new(Section::Holistic, self.backends.stream_lazy(request));
        forward(pipeline, &mut texts, events).await?;

        info!("Persona '{}' complete", persona);
        Ok(texts.into_analysis())
    }
}

/// Drains one pipeline on its own, recording and emitting every fragment.
async fn forward(
    pipeline: SectionPipeline,
    texts: &mut SectionTexts,
    events: &EventSender,
) -> Result<(), AnalysisError> {
    let section = pipeline.section();
    texts.set(section, String::new());

    let mut fragments = pipeline.into_fragments();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        texts.append(section, &fragment);
        emit(
            events,
            ProgressEvent::Stream {
                section,
                chunk: fragment,
            },
        )
        .await?;
    }
    debug!("Section '{}' finished ({} chars)", section, texts.get(section).len());
    Ok(())
}
