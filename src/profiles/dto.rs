use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profiles::repo_types::{Education, Experience, ProfileFields, Social};

/// Drops absent and blank values.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Body of `POST /profile`; skills arrive as a comma separated string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRequest {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub skills: Option<String>,
    pub bio: Option<String>,
    pub githubusername: Option<String>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
}

pub fn split_skills(skills: &str) -> Vec<String> {
    skills
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl From<ProfileRequest> for ProfileFields {
    fn from(r: ProfileRequest) -> Self {
        Self {
            company: present(r.company),
            website: present(r.website),
            location: present(r.location),
            status: r.status.unwrap_or_default().trim().to_string(),
            skills: split_skills(r.skills.as_deref().unwrap_or_default()),
            bio: present(r.bio),
            githubusername: present(r.githubusername),
            social: Social {
                youtube: present(r.youtube),
                twitter: present(r.twitter),
                facebook: present(r.facebook),
                linkedin: present(r.linkedin),
                instagram: present(r.instagram),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExperienceRequest {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub current: bool,
    pub description: Option<String>,
}

impl ExperienceRequest {
    pub fn into_entry(self) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            location: present(self.location),
            from: self.from.trim().to_string(),
            to: present(self.to),
            current: self.current,
            description: present(self.description),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EducationRequest {
    pub school: String,
    pub degree: String,
    pub fieldofstudy: String,
    pub from: String,
    pub to: Option<String>,
    pub current: bool,
    pub description: Option<String>,
}

impl EducationRequest {
    pub fn into_entry(self) -> Education {
        Education {
            id: Uuid::new_v4(),
            school: self.school.trim().to_string(),
            degree: self.degree.trim().to_string(),
            fieldofstudy: self.fieldofstudy.trim().to_string(),
            from: self.from.trim().to_string(),
            to: present(self.to),
            current: self.current,
            description: present(self.description),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_are_split_and_trimmed() {
        assert_eq!(split_skills(" rust, go ,,  sql "), ["rust", "go", "sql"]);
        assert!(split_skills("").is_empty());
    }

    #[test]
    fn blank_fields_are_dropped() {
        let fields = ProfileFields::from(ProfileRequest {
            company: Some("   ".into()),
            website: Some("https://example.com".into()),
            status: Some(" Developer ".into()),
            skills: Some("rust".into()),
            twitter: Some("".into()),
            linkedin: Some("in/someone".into()),
            ..Default::default()
        });
        assert_eq!(fields.company, None);
        assert_eq!(fields.website.as_deref(), Some("https://example.com"));
        assert_eq!(fields.status, "Developer");
        assert_eq!(fields.social.twitter, None);
        assert_eq!(fields.social.linkedin.as_deref(), Some("in/someone"));
    }

    #[test]
    fn entries_get_fresh_ids() {
        let req = || ExperienceRequest {
            title: "Engineer".into(),
            company: "Acme".into(),
            from: "2020-01-01".into(),
            ..Default::default()
        };
        assert_ne!(req().into_entry().id, req().into_entry().id);
    }
}
