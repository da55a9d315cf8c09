use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Test as listed by `/api/tests/` (questions may be present but are unused)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course: i64,
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
    /// Minutes; only some backends send it
    #[serde(default)]
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course: i64,
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
    /// Minutes; only some backends send it
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn default_passing_score() -> u32 {
    70
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

fn default_points() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub text: String,
}

/// One selected answer in a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSelection {
    pub question_id: i64,
    pub answer_id: i64,
}

/// Response of `/api/tests/{id}/submit/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    pub score: f64,
    #[serde(default)]
    pub certificate_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_with_questions() {
        let json = r#"{"id": 3, "title": "Final", "description": "", "course": 1,
            "passing_score": 80, "language": "en", "questions": [
                {"id": 10, "text": "Q1", "points": 2, "answers": [
                    {"id": 100, "text": "A"}, {"id": 101, "text": "B"}
                ]}
            ]}"#;
        let test: Test = serde_json::from_str(json).unwrap();
        assert_eq!(test.passing_score, 80);
        assert_eq!(test.questions[0].points, 2);
        assert_eq!(test.questions[0].answers.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let test: Test = serde_json::from_str(r#"{"id": 1, "title": "T", "course": 2}"#).unwrap();
        assert_eq!(test.passing_score, 70);
        assert_eq!(test.time_limit, None);
        assert!(test.questions.is_empty());
    }

    #[test]
    fn test_time_limit_only_when_sent() {
        let listed: TestSummary = serde_json::from_str(
            r#"{"id": 1, "title": "T", "course": 2, "passing_score": 60}"#,
        )
        .unwrap();
        assert_eq!(listed.time_limit, None);

        let timed: TestSummary =
            serde_json::from_str(r#"{"id": 1, "title": "T", "course": 2, "time_limit": 45}"#)
                .unwrap();
        assert_eq!(timed.time_limit, Some(45));
    }

    #[test]
    fn test_parse_result_with_and_without_certificate() {
        let with: TestResult =
            serde_json::from_str(r#"{"score": 90.0, "passed": true, "certificate_id": "1-2-ab"}"#)
                .unwrap();
        assert_eq!(with.certificate_id.as_deref(), Some("1-2-ab"));

        let without: TestResult =
            serde_json::from_str(r#"{"score": 40.5, "passed": false}"#).unwrap();
        assert!(without.certificate_id.is_none());
        assert!(!without.passed);
    }
}
