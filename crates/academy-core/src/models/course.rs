use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub language_display: Option<String>,
    #[serde(default)]
    pub materials_count: u32,
    #[serde(default)]
    pub tests_count: u32,
}

impl Course {
    /// Number of completable items (materials and tests)
    pub fn total_items(&self) -> u32 {
        self.materials_count + self.tests_count
    }

    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Video,
    Presentation,
    #[default]
    Document,
    Protocol,
    Research,
    Recommendation,
    #[serde(other)]
    Other,
}

impl MaterialType {
    pub fn label(&self) -> &'static str {
        match self {
            MaterialType::Video => "video",
            MaterialType::Presentation => "slides",
            MaterialType::Document => "doc",
            MaterialType::Protocol => "protocol",
            MaterialType::Research => "research",
            MaterialType::Recommendation => "guide",
            MaterialType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub course: Option<i64>,
    #[serde(default)]
    pub material_type: MaterialType,
    #[serde(default)]
    pub material_type_display: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Material {
    pub fn is_video(&self) -> bool {
        self.material_type == MaterialType::Video
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
    pub material: i64,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Depth-first walk yielding each comment with its nesting depth
    pub fn flatten(comments: &[Comment]) -> Vec<(usize, &Comment)> {
        fn walk<'a>(comments: &'a [Comment], depth: usize, out: &mut Vec<(usize, &'a Comment)>) {
            for comment in comments {
                out.push((depth, comment));
                walk(&comment.replies, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(comments, 0, &mut out);
        out
    }
}

/// A comment to be posted as a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub material: i64,
    pub content: String,
    pub parent: Option<i64>,
}

impl NewComment {
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("content".to_string(), self.content.clone()),
            ("material".to_string(), self.material.to_string()),
        ];
        if let Some(parent) = self.parent {
            fields.push(("parent".to_string(), parent.to_string()));
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(default)]
    pub id: Option<i64>,
    pub course: i64,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub last_access: Option<DateTime<Utc>>,
    #[serde(default)]
    pub materials_completed: Vec<i64>,
    #[serde(default)]
    pub tests_completed: Vec<i64>,
    #[serde(default)]
    pub materials_completed_count: u32,
    #[serde(default)]
    pub tests_completed_count: u32,
}

impl UserProgress {
    pub fn completed_items(&self) -> u32 {
        self.materials_completed_count + self.tests_completed_count
    }

    pub fn has_completed_material(&self, material_id: i64) -> bool {
        self.materials_completed.contains(&material_id)
    }

    pub fn has_completed_test(&self, test_id: i64) -> bool {
        self.tests_completed.contains(&test_id)
    }
}
