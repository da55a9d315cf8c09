use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub certificate_id: String,
    pub course: i64,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: f64,
}

impl Certificate {
    pub fn course_display(&self) -> String {
        self.course_title
            .clone()
            .unwrap_or_else(|| format!("Course #{}", self.course))
    }
}
