//! Section pipelines: one flattened fragment stream per profile section.
//!
//! A two-step plan is driven by an explicit state machine
//! (`Generating → Refining → Done`), so consumers see a single sequence no
//! matter how many backend calls a section chains internally.

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::debug;

use crate::analysis::plan::{job_match_header, job_match_separator, RefineStep, SectionPlan};
use crate::llm_client::{Backends, FragmentStream, GenerationRequest, LlmError};
use crate::models::analysis::Section;

/// Fragments paired with the section they belong to.
pub type TaggedStream = BoxStream<'static, Result<(String, Section), LlmError>>;

enum PipelineState {
    Generating {
        fragments: FragmentStream,
        draft: String,
        refine: Option<RefineStep>,
    },
    Refining {
        fragments: FragmentStream,
    },
    Done,
}

/// A lazy fragment stream for one section. Consumed exactly once.
pub struct SectionPipeline {
    section: Section,
    fragments: FragmentStream,
}

impl SectionPipeline {
    pub fn new(section: Section, fragments: FragmentStream) -> Self {
        Self { section, fragments }
    }

    pub fn from_plan(section: Section, plan: SectionPlan, backends: &Backends) -> Self {
        let fragments: FragmentStream = match plan {
            SectionPlan::Placeholder(text) => stream::once(async move { Ok(text) }).boxed(),
            SectionPlan::Single(request) => backends.stream_lazy(request),
            SectionPlan::TwoStep { generate, refine } => {
                two_step(backends.clone(), backends.stream_lazy(generate), refine)
            }
        };
        Self::new(section, fragments)
    }

    /// Streams each job-match request in turn, with a numbered header before
    /// each analysis and a separator between them.
    pub fn job_match(requests: Vec<GenerationRequest>, backends: &Backends) -> Self {
        let parts: Vec<FragmentStream> = requests
            .into_iter()
            .enumerate()
            .flat_map(|(i, request)| {
                let mut parts: Vec<FragmentStream> = Vec::with_capacity(3);
                if i > 0 {
                    parts.push(stream::once(async { Ok(job_match_separator()) }).boxed());
                }
                let header = job_match_header(i + 1);
                parts.push(stream::once(async move { Ok(header) }).boxed());
                parts.push(backends.stream_lazy(request));
                parts
            })
            .collect();
        Self::new(Section::JobMatch, stream::iter(parts).flatten().boxed())
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn into_fragments(self) -> FragmentStream {
        self.fragments
    }

    pub fn into_tagged(self) -> TaggedStream {
        let section = self.section;
        self.fragments
            .map(move |fragment| fragment.map(|f| (f, section)))
            .boxed()
    }
}

fn two_step(backends: Backends, generate: FragmentStream, refine: RefineStep) -> FragmentStream {
    let initial = PipelineState::Generating {
        fragments: generate,
        draft: String::new(),
        refine: Some(refine),
    };

    stream::unfold(initial, move |state| {
        let backends = backends.clone();
        async move {
            let mut state = state;
            loop {
                state = match state {
                    PipelineState::Generating {
                        mut fragments,
                        mut draft,
                        refine,
                    } => match fragments.next().await {
                        Some(Ok(fragment)) => {
                            draft.push_str(&fragment);
                            let next = PipelineState::Generating {
                                fragments,
                                draft,
                                refine,
                            };
                            return Some((Ok(fragment), next));
                        }
                        Some(Err(e)) => return Some((Err(e), PipelineState::Done)),
                        None => match refine {
                            Some(refine) => {
                                debug!("Draft complete ({} chars), refining", draft.len());
                                PipelineState::Refining {
                                    fragments: backends.stream_lazy(refine(&draft)),
                                }
                            }
                            None => PipelineState::Done,
                        },
                    },
                    PipelineState::Refining { mut fragments } => {
                        match fragments.next().await {
                            Some(Ok(fragment)) => {
                                return Some((Ok(fragment), PipelineState::Refining { fragments }))
                            }
                            Some(Err(e)) => return Some((Err(e), PipelineState::Done)),
                            None => PipelineState::Done,
                        }
                    }
                    PipelineState::Done => return None,
                };
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::UserContext;
    use crate::analysis::plan::{job_match_requests, join_job_matches, profile_section_plan};
    use crate::llm_client::BackendKind;
    use crate::models::profile::fixtures::sample_profile;
    use crate::testing::{scripted_backends, ScriptedSource};
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_placeholder_yields_single_fragment_without_calls() {
        let (backends, source) = scripted_backends(ScriptedSource::new());
        let pipeline = SectionPipeline::from_plan(
            Section::Skills,
            SectionPlan::Placeholder("No skills listed.".to_string()),
            &backends,
        );
        let tagged: Vec<(String, Section)> = pipeline.into_tagged().try_collect().await.unwrap();
        assert_eq!(tagged, vec![("No skills listed.".to_string(), Section::Skills)]);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_headline_streams_draft_then_refinement() {
        let (backends, source) = scripted_backends(
            ScriptedSource::new()
                .respond_fragments("creative professional headline writer", &["OPT 1", " OPT 2"])
                .respond_fragments("strategic career advisor", &["Keep", " OPT 2"]),
        );
        let plan = profile_section_plan(
            Section::Headline,
            &sample_profile(),
            &UserContext::defaults("general"),
        )
        .unwrap();
        let fragments: Vec<String> = SectionPipeline::from_plan(Section::Headline, plan, &backends)
            .into_fragments()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(fragments, vec!["OPT 1", " OPT 2", "Keep", " OPT 2"]);
        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.streamed));
        assert_eq!(calls[0].backend, BackendKind::Fast);
        assert_eq!(calls[1].backend, BackendKind::Reasoning);
        assert!(calls[1].prompt.contains("GENERATED ALTERNATIVES: OPT 1 OPT 2"));
    }

    #[tokio::test]
    async fn test_failed_draft_never_starts_refinement() {
        let (backends, source) = scripted_backends(
            ScriptedSource::new().fail_after("creative professional headline writer", &["partial"]),
        );
        let plan = profile_section_plan(
            Section::Headline,
            &sample_profile(),
            &UserContext::defaults("general"),
        )
        .unwrap();
        let mut fragments =
            SectionPipeline::from_plan(Section::Headline, plan, &backends).into_fragments();

        assert_eq!(fragments.next().await.unwrap().unwrap(), "partial");
        assert!(fragments.next().await.unwrap().is_err());
        assert!(fragments.next().await.is_none());
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_job_match_stream_matches_whole_text_layout() {
        let (backends, _) = scripted_backends(
            ScriptedSource::new()
                .respond("#1", "fit is strong")
                .respond("#2", "fit is weak"),
        );
        let profile = sample_profile();
        let requests = job_match_requests(
            &profile,
            &UserContext::defaults("general"),
            &["first role", "second role"],
        );
        let streamed: String = SectionPipeline::job_match(requests, &backends)
            .into_fragments()
            .try_collect::<Vec<_>>()
            .await
            .unwrap()
            .concat();

        let whole = join_job_matches(&["fit is strong".to_string(), "fit is weak".to_string()]);
        assert_eq!(streamed, whole);
    }
}
