//! Data models for academy API entities.
//!
//! - `Course`, `Material`, `Comment`, `UserProgress`: course content and progress
//! - `Test`, `Question`, `Answer`, `TestResult`: tests and their submission
//! - `Certificate`: certificates issued on course completion

pub mod certificate;
pub mod course;
pub mod quiz;

pub use certificate::Certificate;
pub use course::{Comment, Course, Material, MaterialType, NewComment, UserProgress};
pub use quiz::{Answer, AnswerSelection, Question, Test, TestResult, TestSummary};

use serde::{Deserialize, Serialize};

/// List endpoint response: a plain array, or a paginated `{results: [...]}`
/// page when the backend has pagination enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Items(Vec<T>),
    Page {
        #[serde(default)]
        count: Option<u64>,
        results: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Items(items) => items,
            Listing::Page { results, .. } => results,
        }
    }
}
