use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn present() -> Option<String> {
    Some("Present".to_string())
}

fn default_personas() -> Vec<String> {
    vec!["general".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub job_title: String,
    pub company: String,
    pub description: String,
    pub start_date: String,
    #[serde(default = "present")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub description: String,
    pub start_date: String,
    #[serde(default = "present")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub organization: String,
}

/// The submitted profile. Read-only for the whole analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub headline: String,
    pub about: String,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_personas: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_job_seeking: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_job_descriptions: Vec<String>,
}

impl Profile {
    /// Personas to analyze, in request order. Empty means `general`.
    pub fn personas(&self) -> Vec<String> {
        if self.target_personas.is_empty() {
            default_personas()
        } else {
            self.target_personas.clone()
        }
    }

    /// Job descriptions long enough to be worth matching against, trimmed.
    pub fn valid_job_descriptions(&self, min_len: usize) -> Vec<&str> {
        if !self.is_job_seeking {
            return Vec::new();
        }
        self.target_job_descriptions
            .iter()
            .map(|d| d.trim())
            .filter(|d| d.chars().count() > min_len)
            .collect()
    }

    pub fn most_recent_role(&self) -> Option<&Experience> {
        self.experiences.first()
    }
}
