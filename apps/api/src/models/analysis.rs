use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which part of the profile a fragment of feedback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Headline,
    About,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    JobMatch,
    Holistic,
}

impl Section {
    /// Sections analyzed in parallel after the headline, in scheduling order.
    pub const PARALLEL: [Section; 6] = [
        Section::About,
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Projects,
        Section::Certifications,
    ];

    /// Sections summarized for the holistic pass, in prompt order.
    pub const SUMMARIZED: [Section; 8] = [
        Section::Headline,
        Section::About,
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Projects,
        Section::Certifications,
        Section::JobMatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Headline => "headline",
            Section::About => "about",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Certifications => "certifications",
            Section::JobMatch => "job_match",
            Section::Holistic => "holistic",
        }
    }

    /// Heading used when this section is quoted in the holistic summary.
    pub fn label(self) -> &'static str {
        match self {
            Section::Headline => "Headline",
            Section::About => "About",
            Section::Experience => "Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Projects => "Projects",
            Section::Certifications => "Certifications",
            Section::JobMatch => "Job Match",
            Section::Holistic => "Holistic",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated text per section for one persona.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionTexts(BTreeMap<Section, String>);

impl SectionTexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, section: Section, fragment: &str) {
        self.0.entry(section).or_default().push_str(fragment);
    }

    pub fn set(&mut self, section: Section, text: String) {
        self.0.insert(section, text);
    }

    pub fn get(&self, section: Section) -> &str {
        self.0.get(&section).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, section: Section) -> bool {
        self.0.contains_key(&section)
    }

    pub fn into_analysis(self) -> PersonaAnalysis {
        let mut texts = self.0;
        let mut take = |s: Section| texts.remove(&s).unwrap_or_default();
        PersonaAnalysis {
            headline_feedback: take(Section::Headline),
            about_feedback: take(Section::About),
            experience_feedback: take(Section::Experience),
            education_feedback: take(Section::Education),
            skills_feedback: take(Section::Skills),
            projects_feedback: take(Section::Projects),
            certifications_feedback: take(Section::Certifications),
            holistic_feedback: take(Section::Holistic),
            job_match_feedback: take(Section::JobMatch),
        }
    }
}

/// Full feedback for one persona, as returned to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaAnalysis {
    pub headline_feedback: String,
    pub about_feedback: String,
    pub experience_feedback: String,
    pub education_feedback: String,
    pub skills_feedback: String,
    pub projects_feedback: String,
    pub certifications_feedback: String,
    pub holistic_feedback: String,
    /// Empty when the job-match stage was skipped.
    #[serde(default)]
    pub job_match_feedback: String,
}

#[cfg(test)]
impl PersonaAnalysis {
    pub fn section(&self, section: Section) -> &str {
        match section {
            Section::Headline => &self.headline_feedback,
            Section::About => &self.about_feedback,
            Section::Experience => &self.experience_feedback,
            Section::Education => &self.education_feedback,
            Section::Skills => &self.skills_feedback,
            Section::Projects => &self.projects_feedback,
            Section::Certifications => &self.certifications_feedback,
            Section::JobMatch => &self.job_match_feedback,
            Section::Holistic => &self.holistic_feedback,
        }
    }
}

/// Whole-response payload keyed by persona id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub results: BTreeMap<String, PersonaAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&Section::JobMatch).unwrap(),
            "\"job_match\""
        );
        assert_eq!(Section::Certifications.to_string(), "certifications");
    }

    #[test]
    fn test_section_texts_appends_in_order() {
        let mut texts = SectionTexts::new();
        texts.append(Section::About, "a");
        texts.append(Section::Skills, "x");
        texts.append(Section::About, "b");
        assert_eq!(texts.get(Section::About), "ab");
        assert_eq!(texts.get(Section::Skills), "x");
        assert_eq!(texts.get(Section::Projects), "");
    }

    #[test]
    fn test_into_analysis_maps_every_section() {
        let mut texts = SectionTexts::new();
        for section in Section::SUMMARIZED.iter().chain([Section::Holistic].iter()) {
            texts.set(*section, section.as_str().to_uppercase());
        }
        let analysis = texts.into_analysis();
        for section in Section::SUMMARIZED.iter().chain([Section::Holistic].iter()) {
            assert_eq!(analysis.section(*section), section.as_str().to_uppercase());
        }
    }

    #[test]
    fn test_missing_job_match_is_empty() {
        let analysis = SectionTexts::new().into_analysis();
        assert_eq!(analysis.job_match_feedback, "");
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["job_match_feedback"], "");
    }
}
