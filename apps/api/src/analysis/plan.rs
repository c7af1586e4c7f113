//! Section plans: what each section analysis asks of the backends.
//!
//! A plan says nothing about delivery. The streaming path turns it into a
//! `SectionPipeline`; the fallback path awaits it whole with `run`.

use crate::analysis::context::{char_prefix, UserContext};
use crate::analysis::prompts::*;
use crate::llm_client::{BackendKind, Backends, GenerationRequest, LlmError};
use crate::models::analysis::{Section, SectionTexts};
use crate::models::profile::Profile;

const JOB_DESCRIPTION_MAX_CHARS: usize = 2000;
const JOB_MATCH_ABOUT_CHARS: usize = 400;
const JOB_MATCH_SKILLS: usize = 15;
const RULE_WIDTH: usize = 60;

/// Builds the second request of a two-step plan from the first one's text.
pub type RefineStep = Box<dyn FnOnce(&str) -> GenerationRequest + Send>;

pub enum SectionPlan {
    /// Nothing to analyze; the fixed advice is the whole result.
    Placeholder(String),
    Single(GenerationRequest),
    /// Draft on one backend, then refine the draft on another.
    TwoStep {
        generate: GenerationRequest,
        refine: RefineStep,
    },
}

impl SectionPlan {
    /// Awaits the plan's full text.
    pub async fn run(self, backends: &Backends) -> Result<String, LlmError> {
        match self {
            SectionPlan::Placeholder(text) => Ok(text),
            SectionPlan::Single(request) => backends.complete(&request).await,
            SectionPlan::TwoStep { generate, refine } => {
                let draft = backends.complete(&generate).await?;
                backends.complete(&refine(&draft)).await
            }
        }
    }
}

fn render(template: &str, context: &UserContext, profile_vars: &[(&str, &str)]) -> String {
    let vars: Vec<(&str, &str)> = context
        .vars()
        .into_iter()
        .chain(profile_vars.iter().copied())
        .collect();
    fill(template, &vars)
}

fn request(
    backend: BackendKind,
    system: &str,
    template: &str,
    context: &UserContext,
    profile_vars: &[(&str, &str)],
    max_tokens: u32,
) -> SectionPlan {
    SectionPlan::Single(GenerationRequest::new(
        backend,
        render(system, context, &[]),
        render(template, context, profile_vars),
        max_tokens,
    ))
}

/// Plan for one of the seven profile sections. `None` for job match and
/// holistic, which are built from several inputs.
pub fn profile_section_plan(
    section: Section,
    profile: &Profile,
    context: &UserContext,
) -> Option<SectionPlan> {
    let plan = match section {
        Section::Headline => headline_plan(&profile.headline, context),
        Section::About => about_plan(&profile.about, context),
        Section::Experience => experience_plan(profile, context),
        Section::Education => education_plan(profile, context),
        Section::Skills => skills_plan(&profile.skills, context),
        Section::Projects => projects_plan(profile, context),
        Section::Certifications => certifications_plan(profile, context),
        Section::JobMatch | Section::Holistic => return None,
    };
    Some(plan)
}

fn headline_plan(headline: &str, context: &UserContext) -> SectionPlan {
    if headline.trim().is_empty() {
        return SectionPlan::Placeholder(
            "No headline provided. A compelling headline is crucial for LinkedIn visibility."
                .to_string(),
        );
    }

    let generate = GenerationRequest::new(
        BackendKind::Fast,
        HEADLINE_GENERATE_SYSTEM,
        render(HEADLINE_GENERATE_PROMPT, context, &[("headline", headline)]),
        800,
    );

    let headline = headline.to_string();
    let context = context.clone();
    let refine: RefineStep = Box::new(move |generated: &str| {
        GenerationRequest::new(
            BackendKind::Reasoning,
            HEADLINE_REFINE_SYSTEM,
            render(
                HEADLINE_REFINE_PROMPT,
                &context,
                &[("headline", headline.as_str()), ("generated", generated)],
            ),
            1200,
        )
    });

    SectionPlan::TwoStep { generate, refine }
}

fn about_plan(about: &str, context: &UserContext) -> SectionPlan {
    if about.trim().is_empty() {
        return SectionPlan::Placeholder(
            "No About section provided. This is a critical section that tells your professional story."
                .to_string(),
        );
    }
    request(
        BackendKind::Reasoning,
        ABOUT_SYSTEM,
        ABOUT_PROMPT,
        context,
        &[("about", about)],
        1500,
    )
}

fn experience_plan(profile: &Profile, context: &UserContext) -> SectionPlan {
    let described: Vec<_> = profile
        .experiences
        .iter()
        .filter(|e| !e.description.trim().is_empty())
        .collect();
    if described.is_empty() {
        return SectionPlan::Placeholder(
            "No experience descriptions provided. Strong descriptions are essential.".to_string(),
        );
    }

    let text = described
        .iter()
        .map(|e| {
            format!(
                "Position: {} at {}\nDuration: {} - {}\nDescription:\n{}",
                e.job_title,
                e.company,
                e.start_date,
                e.end_date.as_deref().unwrap_or("Present"),
                e.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    request(
        BackendKind::Fast,
        EXPERIENCE_SYSTEM,
        EXPERIENCE_PROMPT,
        context,
        &[("experience", text.as_str())],
        1200,
    )
}

fn education_plan(profile: &Profile, context: &UserContext) -> SectionPlan {
    if profile.education.iter().all(|e| e.degree.trim().is_empty()) {
        return SectionPlan::Placeholder("No education information provided.".to_string());
    }

    let text = profile
        .education
        .iter()
        .map(|e| {
            let mut entry = format!(
                "{} from {}\nDuration: {} - {}",
                e.degree,
                e.institution,
                e.start_date,
                e.end_date.as_deref().unwrap_or("Not specified")
            );
            if !e.description.is_empty() {
                entry.push('\n');
                entry.push_str(&e.description);
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n");

    request(
        BackendKind::Fast,
        EDUCATION_SYSTEM,
        EDUCATION_PROMPT,
        context,
        &[("education", text.as_str())],
        800,
    )
}

fn skills_plan(skills: &[String], context: &UserContext) -> SectionPlan {
    if skills.is_empty() {
        return SectionPlan::Placeholder(format!(
            "No skills listed. Add 5-10 core skills relevant to {}.",
            context.industry
        ));
    }
    let text = skills.join(", ");
    request(
        BackendKind::Fast,
        SKILLS_SYSTEM,
        SKILLS_PROMPT,
        context,
        &[("skills", text.as_str())],
        1000,
    )
}

fn projects_plan(profile: &Profile, context: &UserContext) -> SectionPlan {
    let named: Vec<_> = profile
        .projects
        .iter()
        .filter(|p| !p.name.trim().is_empty())
        .collect();
    if named.is_empty() {
        return SectionPlan::Placeholder(format!(
            "No projects listed. For {} professionals, projects can showcase expertise.",
            context.seniority
        ));
    }

    let text = named
        .iter()
        .map(|p| format!("Project: {}\n{}", p.name, p.description))
        .collect::<Vec<_>>()
        .join("\n\n");

    request(
        BackendKind::Fast,
        PROJECTS_SYSTEM,
        PROJECTS_PROMPT,
        context,
        &[("projects", text.as_str())],
        1000,
    )
}

fn certifications_plan(profile: &Profile, context: &UserContext) -> SectionPlan {
    let named: Vec<_> = profile
        .certifications
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect();
    if named.is_empty() {
        return SectionPlan::Placeholder(
            "No certifications listed. Relevant certifications can boost credibility.".to_string(),
        );
    }

    let text = named
        .iter()
        .map(|c| format!("{} - {}", c.name, c.organization))
        .collect::<Vec<_>>()
        .join("\n");

    request(
        BackendKind::Fast,
        CERTIFICATIONS_SYSTEM,
        CERTIFICATIONS_PROMPT,
        context,
        &[("certifications", text.as_str())],
        800,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Job match
// ────────────────────────────────────────────────────────────────────────────

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Heading emitted before the analysis of job description `number` (1-based).
pub fn job_match_header(number: usize) -> String {
    format!("JOB MATCH ANALYSIS #{number}\n{}\n\n", rule())
}

/// Emitted between consecutive job-match analyses.
pub fn job_match_separator() -> String {
    format!("\n\n{}\n", rule())
}

/// Joins whole-text job-match analyses into the same layout the stream produces.
pub fn join_job_matches(analyses: &[String]) -> String {
    analyses
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}{}", job_match_header(i + 1), text))
        .collect::<Vec<_>>()
        .join(&job_match_separator())
}

/// One request per valid job description, in order.
pub fn job_match_requests(
    profile: &Profile,
    context: &UserContext,
    descriptions: &[&str],
) -> Vec<GenerationRequest> {
    let recent = profile.most_recent_role();
    let skills = profile
        .skills
        .iter()
        .take(JOB_MATCH_SKILLS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let summary = fill(
        JOB_MATCH_PROFILE_SUMMARY,
        &[
            (
                "recent_title",
                recent.map(|e| e.job_title.as_str()).unwrap_or("N/A"),
            ),
            (
                "recent_company",
                recent.map(|e| e.company.as_str()).unwrap_or("N/A"),
            ),
            ("skills", skills.as_str()),
            ("headline", profile.headline.as_str()),
            ("about", char_prefix(&profile.about, JOB_MATCH_ABOUT_CHARS)),
        ],
    );
    let system = render(JOB_MATCH_SYSTEM, context, &[]);

    descriptions
        .iter()
        .enumerate()
        .map(|(i, description)| {
            let number = (i + 1).to_string();
            let prompt = fill(
                JOB_MATCH_PROMPT,
                &[
                    ("number", number.as_str()),
                    ("profile_summary", summary.as_str()),
                    (
                        "job_description",
                        char_prefix(description, JOB_DESCRIPTION_MAX_CHARS),
                    ),
                ],
            );
            GenerationRequest::new(BackendKind::Reasoning, system.clone(), prompt, 2500)
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Holistic
// ────────────────────────────────────────────────────────────────────────────

/// Builds the meta-analysis request from a bounded prefix of every section
/// produced so far.
pub fn holistic_request(
    texts: &SectionTexts,
    context: &UserContext,
    prefix_chars: usize,
) -> GenerationRequest {
    let summary = Section::SUMMARIZED
        .iter()
        .filter(|s| texts.contains(**s))
        .map(|s| format!("{}: {}...", s.label(), char_prefix(texts.get(*s), prefix_chars)))
        .collect::<Vec<_>>()
        .join("\n");

    GenerationRequest::new(
        BackendKind::Reasoning,
        HOLISTIC_SYSTEM,
        render(
            HOLISTIC_PROMPT,
            context,
            &[("feedback_summary", summary.as_str())],
        ),
        2000,
    )
}
