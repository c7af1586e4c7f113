//! Context stage: one whole-text call per persona that classifies the profile.
//!
//! The backend answers with `LABEL: value` lines. Any label that is missing
//! (or empty) keeps its default, so a sloppy answer never fails the stage.

use tracing::{debug, info};

use crate::analysis::prompts::{fill, CONTEXT_PROMPT, CONTEXT_SYSTEM};
use crate::llm_client::{BackendKind, Backends, GenerationRequest, LlmError};
use crate::models::profile::Profile;

const CONTEXT_MAX_TOKENS: u32 = 300;
const ABOUT_PREVIEW_CHARS: usize = 500;
const SKILLS_PREVIEW: usize = 10;

const UNKNOWN_PERSONA: &str = "a professional audience";

/// Audience description used to frame prompts for a persona id.
pub fn persona_description(persona: &str) -> &'static str {
    match persona {
        "general" => "a general professional audience",
        "recruiter" => "recruiters actively searching for candidates",
        "hiring_manager" => "hiring managers evaluating technical fit",
        "client" => "potential clients looking for expertise",
        "investor" => "investors evaluating business potential",
        "peer" => "industry peers and potential collaborators",
        _ => UNKNOWN_PERSONA,
    }
}

/// Derived professional context shared by every section of one persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub seniority: String,
    pub industry: String,
    pub career_goal: String,
    pub target_audience: String,
    pub tone_preference: String,
    pub key_strength: String,
    pub primary_gap: String,
    pub persona: String,
}

impl UserContext {
    pub fn defaults(persona: &str) -> Self {
        Self {
            seniority: "Mid-level".to_string(),
            industry: "Technology".to_string(),
            career_goal: "Career growth".to_string(),
            target_audience: persona.to_string(),
            tone_preference: "Professional-formal".to_string(),
            key_strength: "Technical skills".to_string(),
            primary_gap: "Quantifiable achievements".to_string(),
            persona: persona.to_string(),
        }
    }

    /// Parses labelled lines out of a context response, keeping defaults for
    /// anything absent.
    pub fn parse(response: &str, persona: &str) -> Self {
        let mut context = Self::defaults(persona);

        for line in response.lines() {
            // First matching label wins for a line.
            let slot = [
                ("SENIORITY:", &mut context.seniority),
                ("INDUSTRY:", &mut context.industry),
                ("CAREER_GOAL:", &mut context.career_goal),
                ("TARGET_AUDIENCE:", &mut context.target_audience),
                ("TONE_PREFERENCE:", &mut context.tone_preference),
                ("KEY_STRENGTH:", &mut context.key_strength),
                ("PRIMARY_GAP:", &mut context.primary_gap),
            ]
            .into_iter()
            .find_map(|(label, field)| line.find(label).map(|at| (at + label.len(), field)));

            if let Some((start, field)) = slot {
                let value = line[start..].trim().trim_matches('*').trim();
                if !value.is_empty() {
                    *field = value.to_string();
                }
            }
        }

        context
    }

    /// Template variables for prompt filling.
    pub fn vars(&self) -> [(&'static str, &str); 7] {
        [
            ("seniority", self.seniority.as_str()),
            ("industry", self.industry.as_str()),
            ("career_goal", self.career_goal.as_str()),
            ("target_audience", self.target_audience.as_str()),
            ("tone_preference", self.tone_preference.as_str()),
            ("key_strength", self.key_strength.as_str()),
            ("primary_gap", self.primary_gap.as_str()),
        ]
    }
}

/// Keeps the first `max` characters of `text` (char-boundary safe).
pub fn char_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}

pub fn context_request(profile: &Profile, persona: &str) -> GenerationRequest {
    let description = persona_description(persona);
    let recent = profile.most_recent_role();
    let skills = profile
        .skills
        .iter()
        .take(SKILLS_PREVIEW)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let experience_count = profile.experiences.len().to_string();

    let prompt = fill(
        CONTEXT_PROMPT,
        &[
            ("persona_description", description),
            ("persona", persona),
            ("experience_count", experience_count.as_str()),
            (
                "recent_title",
                recent.map(|e| e.job_title.as_str()).unwrap_or("Not specified"),
            ),
            (
                "recent_company",
                recent.map(|e| e.company.as_str()).unwrap_or("Not specified"),
            ),
            ("skills", skills.as_str()),
            ("headline", profile.headline.as_str()),
            ("about", char_prefix(&profile.about, ABOUT_PREVIEW_CHARS)),
        ],
    );
    let system = fill(CONTEXT_SYSTEM, &[("persona_description", description)]);

    GenerationRequest::new(BackendKind::Fast, system, prompt, CONTEXT_MAX_TOKENS)
}

/// Runs the context stage for one persona.
pub async fn determine_user_context(
    profile: &Profile,
    persona: &str,
    backends: &Backends,
) -> Result<UserContext, LlmError> {
    let response = backends
        .complete(&context_request(profile, persona))
        .await?;
    let context = UserContext::parse(&response, persona);
    debug!("Context response: {response:?}");
    info!(
        "Context for persona '{}': {} / {} / goal={}",
        persona, context.seniority, context.industry, context.career_goal
    );
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::fixtures::sample_profile;
    use crate::testing::{scripted_backends, ScriptedSource};

    const FULL_RESPONSE: &str = "SENIORITY: Senior\n\
        INDUSTRY: Fintech\n\
        CAREER_GOAL: Thought leadership\n\
        TARGET_AUDIENCE: recruiter\n\
        TONE_PREFERENCE: Technical\n\
        KEY_STRENGTH: Distributed systems design\n\
        PRIMARY_GAP: Public speaking evidence";

    #[test]
    fn test_parse_reads_every_label() {
        let ctx = UserContext::parse(FULL_RESPONSE, "recruiter");
        assert_eq!(ctx.seniority, "Senior");
        assert_eq!(ctx.industry, "Fintech");
        assert_eq!(ctx.career_goal, "Thought leadership");
        assert_eq!(ctx.target_audience, "recruiter");
        assert_eq!(ctx.tone_preference, "Technical");
        assert_eq!(ctx.key_strength, "Distributed systems design");
        assert_eq!(ctx.primary_gap, "Public speaking evidence");
        assert_eq!(ctx.persona, "recruiter");
    }

    #[test]
    fn test_parse_missing_labels_keep_defaults() {
        let ctx = UserContext::parse("INDUSTRY: Healthcare\nsome chatter", "peer");
        assert_eq!(ctx.industry, "Healthcare");
        assert_eq!(ctx.seniority, "Mid-level");
        assert_eq!(ctx.target_audience, "peer");
        assert_eq!(ctx.primary_gap, "Quantifiable achievements");
    }

    #[test]
    fn test_parse_garbage_is_all_defaults() {
        assert_eq!(
            UserContext::parse("I cannot help with that.", "general"),
            UserContext::defaults("general")
        );
    }

    #[test]
    fn test_parse_tolerates_markdown_and_empty_values() {
        let ctx = UserContext::parse("**SENIORITY:** Executive\nINDUSTRY:   \n", "general");
        assert_eq!(ctx.seniority, "Executive");
        assert_eq!(ctx.industry, "Technology");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let ctx = UserContext::parse("KEY_STRENGTH: Scale: 10M users", "general");
        assert_eq!(ctx.key_strength, "Scale: 10M users");
    }

    #[test]
    fn test_unknown_persona_gets_generic_description() {
        assert_eq!(persona_description("astronaut"), "a professional audience");
        assert_eq!(
            persona_description("recruiter"),
            "recruiters actively searching for candidates"
        );
    }

    #[test]
    fn test_char_prefix_is_boundary_safe() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("hi", 10), "hi");
    }

    #[test]
    fn test_context_request_describes_persona_and_recent_role() {
        let request = context_request(&sample_profile(), "investor");
        assert_eq!(request.backend, BackendKind::Fast);
        assert!(request.system.contains("investors evaluating business potential"));
        assert!(request.prompt.contains("Senior Engineer at Acme Pay"));
        assert!(request.prompt.contains("TARGET_AUDIENCE: investor"));
        assert!(request.prompt.contains("Skills: Rust, Go, Postgres"));
    }

    #[test]
    fn test_context_request_keeps_headline_braces_literal() {
        let mut profile = sample_profile();
        profile.headline = "Builder of {about} pages".to_string();
        let request = context_request(&profile, "general");
        assert!(request.prompt.contains("Builder of {about} pages"));
        assert_eq!(request.prompt.matches("reliable distributed systems").count(), 1);
    }

    #[tokio::test]
    async fn test_determine_user_context_uses_backend_answer() {
        let (backends, source) =
            scripted_backends(ScriptedSource::new().respond("professional context", FULL_RESPONSE));
        let ctx = determine_user_context(&sample_profile(), "recruiter", &backends)
            .await
            .unwrap();
        assert_eq!(ctx.industry, "Fintech");
        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].streamed);
    }
}
