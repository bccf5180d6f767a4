use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Exam,
    Quiz,
    #[default]
    Assignment,
    Project,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub course: String,
    pub assessment: String,
    #[serde(default)]
    pub kind: AssessmentKind,
    pub score: f64,
    pub max_score: f64,
    /// Relative weight within the course; zero means unweighted.
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Grade {
    /// Score as a percentage, `None` if the max score is not positive.
    pub fn percentage(&self) -> Option<f64> {
        if self.max_score > 0.0 {
            Some(self.score / self.max_score * 100.0)
        } else {
            None
        }
    }
}

/// Letter grade for a percentage on the usual 90/80/70/60 scale.
pub fn letter_grade(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 90.0 => "A",
        p if p >= 80.0 => "B",
        p if p >= 70.0 => "C",
        p if p >= 60.0 => "D",
        _ => "F",
    }
}

fn grade_points(letter: &str) -> f64 {
    match letter {
        "A" => 4.0,
        "B" => 3.0,
        "C" => 2.0,
        "D" => 1.0,
        _ => 0.0,
    }
}

/// Weighted average percentage of a set of grades.
///
/// Falls back to a plain mean when no grade carries a weight.
pub fn weighted_average<'a>(grades: impl IntoIterator<Item = &'a Grade>) -> Option<f64> {
    let scored: Vec<(f64, f64)> = grades
        .into_iter()
        .filter_map(|g| g.percentage().map(|p| (p, g.weight.max(0.0))))
        .collect();
    if scored.is_empty() {
        return None;
    }

    let total_weight: f64 = scored.iter().map(|(_, w)| w).sum();
    if total_weight > 0.0 {
        Some(scored.iter().map(|(p, w)| p * w).sum::<f64>() / total_weight)
    } else {
        Some(scored.iter().map(|(p, _)| p).sum::<f64>() / scored.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub course: String,
    pub average: f64,
    pub letter: &'static str,
    pub count: usize,
}

/// Per-course averages, sorted by course name.
pub fn course_summaries(grades: &[Grade]) -> Vec<CourseSummary> {
    let mut by_course: BTreeMap<&str, Vec<&Grade>> = BTreeMap::new();
    for grade in grades {
        by_course.entry(grade.course.as_str()).or_default().push(grade);
    }

    by_course
        .into_iter()
        .filter_map(|(course, grades)| {
            let average = weighted_average(grades.iter().copied())?;
            Some(CourseSummary {
                course: course.to_string(),
                average,
                letter: letter_grade(average),
                count: grades.len(),
            })
        })
        .collect()
}

/// Unweighted 4.0-scale GPA across course summaries.
pub fn gpa(summaries: &[CourseSummary]) -> Option<f64> {
    if summaries.is_empty() {
        return None;
    }
    let total: f64 = summaries.iter().map(|s| grade_points(s.letter)).sum();
    Some(total / summaries.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(course: &str, score: f64, max: f64, weight: f64) -> Grade {
        Grade {
            id: String::new(),
            user_id: "u1".into(),
            course: course.into(),
            assessment: "test".into(),
            kind: AssessmentKind::Exam,
            score,
            max_score: max,
            weight,
            date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_and_letter() {
        assert_eq!(grade("Math", 45.0, 50.0, 0.0).percentage(), Some(90.0));
        assert_eq!(grade("Math", 1.0, 0.0, 0.0).percentage(), None);
        assert_eq!(letter_grade(90.0), "A");
        assert_eq!(letter_grade(89.9), "B");
        assert_eq!(letter_grade(12.0), "F");
    }

    #[test]
    fn test_weighted_average() {
        let grades = [grade("Math", 100.0, 100.0, 3.0), grade("Math", 60.0, 100.0, 1.0)];
        assert_eq!(weighted_average(grades.iter()), Some(90.0));

        let unweighted = [grade("Math", 100.0, 100.0, 0.0), grade("Math", 60.0, 100.0, 0.0)];
        assert_eq!(weighted_average(unweighted.iter()), Some(80.0));

        assert_eq!(weighted_average(std::iter::empty()), None);
    }

    #[test]
    fn test_course_summaries_and_gpa() {
        let grades = vec![
            grade("Physics", 70.0, 100.0, 1.0),
            grade("Art", 95.0, 100.0, 1.0),
            grade("Physics", 80.0, 100.0, 1.0),
        ];
        let summaries = course_summaries(&grades);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].course, "Art");
        assert_eq!(summaries[0].letter, "A");
        assert_eq!(summaries[1].average, 75.0);
        assert_eq!(summaries[1].count, 2);
        assert_eq!(gpa(&summaries), Some(3.0));
    }
}
