// All LLM prompt templates for profile analysis.
// Placeholders are `{name}`. `fill` substitutes in a single pass, so text
// coming from a profile or a previous answer is never re-expanded.

/// Replaces every known `{key}` in `template` with its value. Unknown
/// placeholders and stray braces are copied through unchanged.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Context
// ────────────────────────────────────────────────────────────────────────────

pub const CONTEXT_SYSTEM: &str = "You are an expert at quickly identifying professional context \
    for optimization targeting {persona_description}. Be precise and concise.";

/// Replace: {persona_description}, {persona}, {headline}, {about}, {experience_count},
///          {recent_title}, {recent_company}, {skills}
pub const CONTEXT_PROMPT: &str = r#"Analyze this LinkedIn profile to determine the user's professional context, specifically optimized for {persona_description}.
Headline: {headline}
About: {about}...
Experience: {experience_count} positions listed
Most Recent Role: {recent_title} at {recent_company}
Skills: {skills}
IMPORTANT: Frame your analysis considering what {persona_description} would prioritize.
Determine and return ONLY the following in this exact format:
SENIORITY: [Entry-level/Mid-level/Senior/Executive/C-Suite]
INDUSTRY: [Primary industry, e.g., Technology, Healthcare, Finance]
CAREER_GOAL: [Their apparent goal for {persona_description}: Job seeking/Career growth/Thought leadership/Networking/Entrepreneurship]
TARGET_AUDIENCE: {persona}
TONE_PREFERENCE: [Current tone: Professional-formal/Professional-casual/Technical/Creative]
KEY_STRENGTH: [Their most obvious strength in 3-5 words]
PRIMARY_GAP: [Most significant gap or opportunity for {persona_description} in 3-5 words]"#;

// ────────────────────────────────────────────────────────────────────────────
// Headline (generate → refine)
// ────────────────────────────────────────────────────────────────────────────

pub const HEADLINE_GENERATE_SYSTEM: &str = "You are a creative professional headline writer.";

/// Replace: context fields, then {headline}
pub const HEADLINE_GENERATE_PROMPT: &str = r#"You are a creative LinkedIn headline generator for a {seniority} professional in {industry}.
Current Headline: "{headline}"
Context:
- Career Goal: {career_goal}
- Target Audience: {target_audience}
- Key Strength: {key_strength}
Generate 5 alternative headline options that are under 220 characters, include relevant keywords, communicate value, are optimized for {target_audience}, and match their tone.
Format each as: OPTION 1: [headline], etc. Then provide a brief analysis of the CURRENT headline's strengths and weaknesses."#;

pub const HEADLINE_REFINE_SYSTEM: &str = "You are a strategic career advisor.";

/// Replace: context fields, then {headline}, {generated}
pub const HEADLINE_REFINE_PROMPT: &str = r#"You are an expert career strategist reviewing headline options for a {seniority} {industry} professional.
CURRENT HEADLINE: "{headline}"
GENERATED ALTERNATIVES: {generated}
Your task is to analyze each alternative, select the TOP 2, and provide specific, actionable recommendations on what to keep, change, and add to the current headline. Be strategic and specific."#;

// ────────────────────────────────────────────────────────────────────────────
// Profile sections
// ────────────────────────────────────────────────────────────────────────────

pub const ABOUT_SYSTEM: &str = "You are an expert at crafting compelling About sections.";

pub const ABOUT_PROMPT: &str = r#"You are the "Persona Calibrator" analyzing an About section for a {seniority} professional in {industry} targeting {target_audience}.
About Section: "{about}"
Context: Goal({career_goal}), Strength({key_strength}), Gap({primary_gap})
Analyze this section for: Structure, Authenticity, Value Proposition, Gap Addressing, Call to Action, and Keyword Optimization. Provide detailed, personalized feedback with specific examples."#;

pub const EXPERIENCE_SYSTEM: &str = "You are an expert at analyzing {industry} experience.";

pub const EXPERIENCE_PROMPT: &str = r#"Analyze these LinkedIn experience entries for a {seniority} {industry} professional targeting {target_audience}:

{experience}

Context-Specific Evaluation:

1. CAREER PROGRESSION:
- Do the roles show clear advancement over time?
- Are the durations appropriate (avoid job-hopping concerns or stagnation)?
- Does the timeline support their {seniority} level claim?

2. TENURE ANALYSIS:
- Are any positions too short (< 6 months) without explanation?
- Are any positions unusually long (5+ years) at the same level?
- Do gaps between positions need addressing?

3. STAR METHOD (Situation, Task, Action, Result):
- Are accomplishments described with context and measurable results?
- Are results framed to appeal to {target_audience}?

4. ACTION VERBS:
- Does each bullet point start with strong action verbs appropriate for {seniority} level?
- Are verbs varied and impactful for {industry}?

5. QUANTIFIABLE METRICS:
- Are there specific numbers relevant to {industry}?
- Do metrics demonstrate progression appropriate for {seniority}?

6. CLARITY & RELEVANCE:
- Are achievements emphasized over tasks?
- Do descriptions showcase "{key_strength}"?
- Is technical depth appropriate for {industry}?

7. ADDRESSING GAPS:
- How well does this address: {primary_gap}?
- Are employment gaps handled appropriately?

Provide specific feedback for improvement with examples tailored to {industry} and {seniority} level."#;

pub const EDUCATION_SYSTEM: &str = "You are an expert in {industry} educational requirements.";

pub const EDUCATION_PROMPT: &str = r#"Analyze this education section for a {seniority} professional in {industry}:

{education}

Context-Specific Evaluation:

1. RELEVANCE TO INDUSTRY:
- Is this education appropriate for {industry}?
- Are there specialized programs or certifications expected in this field?

2. SENIORITY ALIGNMENT:
- At {seniority} level, should education be emphasized or de-emphasized?
- Is the education positioning appropriate?

3. TIMELINE ANALYSIS:
- Does the education timeline align with career progression?
- Are degrees recent or outdated for the field?
- Any gaps between education and career start?

4. COMPLETENESS:
- Should honors, GPA, relevant coursework be included for {target_audience}?
- Are there relevant projects or research worth highlighting?

5. CAREER GOAL SUPPORT:
- Does this education support their goal of {career_goal}?
- Are there additional degrees/programs that would strengthen positioning?

Provide brief, actionable feedback tailored to their context."#;

pub const SKILLS_SYSTEM: &str = "You are an expert in {industry} skill requirements.";

pub const SKILLS_PROMPT: &str = r#"Analyze this skills list for a {seniority} professional in {industry}: {skills}
Evaluate: Industry Relevance, Seniority Alignment, Career Goal Support, Balance (technical vs. soft), and how well it highlights their strength '{key_strength}'. Suggest skills to add, remove, or prioritize."#;

pub const PROJECTS_SYSTEM: &str = "You are an expert at evaluating {industry} project portfolios.";

pub const PROJECTS_PROMPT: &str = r#"Analyze these project entries for a {seniority} {industry} professional targeting {target_audience}:
{projects}
Evaluate: Industry Relevance, Audience Appeal, Strength Demonstration ('{key_strength}'), Impact & Outcomes. Provide actionable feedback."#;

pub const CERTIFICATIONS_SYSTEM: &str = "You are an expert in certifications for {industry}.";

pub const CERTIFICATIONS_PROMPT: &str = r#"Analyze these certifications for a {seniority} {industry} professional: {certifications}
Evaluate: Industry Relevance, Seniority Appropriateness, and support for their career goal. Suggest key certifications if any are missing."#;

// ────────────────────────────────────────────────────────────────────────────
// Job match
// ────────────────────────────────────────────────────────────────────────────

pub const JOB_MATCH_SYSTEM: &str =
    "You are an expert at matching candidates to job requirements for {industry} roles.";

/// Replace: {profile_summary}, {number}, {job_description}
pub const JOB_MATCH_PROMPT: &str = r#"You are an expert ATS (Applicant Tracking System) analyst and career coach.

{profile_summary}

TARGET JOB DESCRIPTION #{number}:
{job_description}

Perform a comprehensive job matching analysis:

1. MATCH SCORE (0-100): Provide an overall match percentage and explain why.

2. KEYWORD ALIGNMENT:
   - Which required keywords from the job description are present in the profile?
   - Which critical keywords are MISSING?

3. SKILLS GAP ANALYSIS:
   - Technical skills present vs. required
   - Soft skills alignment
   - What skills need to be added to the profile?

4. EXPERIENCE ALIGNMENT:
   - Does their experience level match the job requirements?
   - Are relevant responsibilities highlighted?

5. ATS OPTIMIZATION:
   - How to improve keyword density for ATS systems
   - Recommended phrases to add to headline/about/experience

6. COMPETITIVE POSITIONING:
   - What makes this candidate stand out for this role?
   - What are the biggest weaknesses compared to ideal candidates?

7. ACTION ITEMS:
   - Top 3 profile changes to increase match score
   - Specific phrases to add
   - Content to emphasize or de-emphasize

Be specific, actionable, and honest about fit."#;

/// Replace: {headline}, {about}, {skills}, {recent_title}, {recent_company}
pub const JOB_MATCH_PROFILE_SUMMARY: &str = r#"
PROFILE SUMMARY:
Headline: {headline}
About: {about}...
Skills: {skills}
Recent Experience: {recent_title} at {recent_company}
"#;

// ────────────────────────────────────────────────────────────────────────────
// Holistic
// ────────────────────────────────────────────────────────────────────────────

pub const HOLISTIC_SYSTEM: &str = "You are a master career strategist.";

/// Replace: context fields, then {feedback_summary}
pub const HOLISTIC_PROMPT: &str = r#"PROFESSIONAL CONTEXT: A {seniority} in {industry} targeting {target_audience} with goal of {career_goal}.
Strength: {key_strength}. Gap: {primary_gap}.
SUMMARY OF AI FEEDBACK:
{feedback_summary}
You are an expert career strategist. Conduct a STRATEGIC META-ANALYSIS.
1. ANALYZE THE ANALYSES: Identify patterns and critical feedback in the summaries above.
2. HOLISTIC ASSESSMENT: Check for consistency, narrative coherence, and audience alignment across the entire profile.
3. STRATEGIC PRIORITIZATION: Provide 3-5 HIGH-IMPACT, STRATEGIC recommendations. What are the MOST IMPORTANT changes they should make?
FORMAT as a prioritized list.
STRATEGIC PRIORITY 1: [Most critical change] Why: [Impact] How: [Action steps]
FINAL STRATEGIC INSIGHT: [One powerful insight about their overall brand.]"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_every_occurrence() {
        let out = fill("{a} and {a} but {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x but y");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        assert_eq!(fill("{known} {unknown}", &[("known", "k")]), "k {unknown}");
    }

    #[test]
    fn test_fill_does_not_rescan_substituted_values() {
        let out = fill(
            "A: {a} B: {b}",
            &[("a", "uses {b} and {a}"), ("b", "bee")],
        );
        assert_eq!(out, "A: uses {b} and {a} B: bee");
    }

    #[test]
    fn test_fill_copies_stray_braces() {
        assert_eq!(fill("{ {x} }{", &[("x", "1")]), "{ 1 }{");
        assert_eq!(fill("{{x}}", &[("x", "1")]), "{1}");
    }
}
