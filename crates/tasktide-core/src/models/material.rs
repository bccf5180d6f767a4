use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{cmp_ignore_case, contains_ignore_case};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    #[default]
    Note,
    Link,
    File,
    Flashcards,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterial {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub kind: MaterialKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudyMaterial {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Search title, subject and tags. `query` is matched case-insensitively.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        contains_ignore_case(&self.title, &query)
            || self
                .subject
                .as_deref()
                .is_some_and(|s| contains_ignore_case(s, &query))
            || self.tags.iter().any(|t| contains_ignore_case(t, &query))
    }
}

/// Distinct subjects across materials, sorted for a sidebar.
pub fn subjects(materials: &[StudyMaterial]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for subject in materials.iter().filter_map(|m| m.subject.as_deref()) {
        if !out.iter().any(|s| s.eq_ignore_ascii_case(subject)) {
            out.push(subject.to_string());
        }
    }
    out.sort_by(|a, b| cmp_ignore_case(a, b));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(title: &str, subject: Option<&str>, tags: &[&str]) -> StudyMaterial {
        StudyMaterial {
            id: String::new(),
            user_id: "u1".into(),
            title: title.into(),
            subject: subject.map(String::from),
            kind: MaterialKind::Note,
            url: None,
            content: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_search_covers_tags_and_subject() {
        let m = material("Week 3 notes", Some("Biology"), &["mitosis", "exam"]);
        assert!(m.matches_search("MITO"));
        assert!(m.matches_search("bio"));
        assert!(m.matches_search("week"));
        assert!(!m.matches_search("physics"));
        assert!(m.has_tag("Exam"));
    }

    #[test]
    fn test_subjects_are_distinct_and_sorted() {
        let materials = vec![
            material("a", Some("chemistry"), &[]),
            material("b", Some("Biology"), &[]),
            material("c", Some("Chemistry"), &[]),
            material("d", None, &[]),
        ];
        assert_eq!(subjects(&materials), vec!["Biology", "chemistry"]);
    }
}
