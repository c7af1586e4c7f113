//! Non-streaming path. Same analyses as the stream, awaited whole.
//!
//! The seven profile sections run concurrently and fail independently: a
//! failed section becomes an `Analysis failed: …` string in its slot. Context,
//! job match and holistic failures abort the whole request.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::context::determine_user_context;
use crate::analysis::plan::{
    holistic_request, job_match_requests, join_job_matches, profile_section_plan,
};
use crate::analysis::{AnalysisError, Analyzer};
use crate::models::analysis::{AnalysisResponse, PersonaAnalysis, Section, SectionTexts};
use crate::models::profile::Profile;

impl Analyzer {
    /// Analyzes every requested persona in order and returns all results at once.
    pub async fn analyze(&self, profile: &Profile) -> Result<AnalysisResponse, AnalysisError> {
        let span = info_span!("analyze", run_id = %Uuid::new_v4());

        async move {
            let mut results = BTreeMap::new();
            for persona in profile.personas() {
                let analysis = self
                    .analyze_persona(profile, &persona)
                    .instrument(info_span!("persona", persona = %persona))
                    .await?;
                results.insert(persona, analysis);
            }
            info!("Analysis complete for {} persona(s)", results.len());
            Ok(AnalysisResponse { results })
        }
        .instrument(span)
        .await
    }

    async fn analyze_persona(
        &self,
        profile: &Profile,
        persona: &str,
    ) -> Result<PersonaAnalysis, AnalysisError> {
        let context = determine_user_context(profile, persona, &self.backends).await?;
        let backends = &self.backends;

        let tasks = std::iter::once(Section::Headline)
            .chain(Section::PARALLEL)
            .filter_map(|section| {
                let plan = profile_section_plan(section, profile, &context)?;
                Some(async move { (section, plan.run(backends).await) })
            });

        let mut texts = SectionTexts::new();
        for (section, outcome) in join_all(tasks).await {
            let text = outcome.unwrap_or_else(|e| {
                warn!("Section '{}' failed, reporting in place: {}", section, e);
                format!("Analysis failed: {e}")
            });
            texts.set(section, text);
        }

        let descriptions = profile.valid_job_descriptions(self.settings.job_description_min_len);
        if !descriptions.is_empty() {
            info!("Matching against {} job description(s)", descriptions.len());
            let mut analyses = Vec::with_capacity(descriptions.len());
            for request in job_match_requests(profile, &context, &descriptions) {
                analyses.push(backends.complete(&request).await?);
            }
            texts.set(Section::JobMatch, join_job_matches(&analyses));
        }

        let request = holistic_request(&texts, &context, self.settings.holistic_prefix_chars);
        texts.set(Section::Holistic, backends.complete(&request).await?);

        Ok(texts.into_analysis())
    }
}
