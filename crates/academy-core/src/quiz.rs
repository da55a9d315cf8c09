//! Test answer collection and result interpretation.
//!
//! An `AnswerSheet` holds one selected answer per question. It refuses to
//! produce a submission until every question has an answer, so an
//! incomplete test never reaches the network.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{AnswerSelection, Test, TestResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("Answered {answered} of {total} questions")]
    Incomplete { answered: usize, total: usize },

    #[error("Question {0} is not part of this test")]
    UnknownQuestion(i64),

    #[error("Answer {answer_id} does not belong to question {question_id}")]
    UnknownAnswer { question_id: i64, answer_id: i64 },
}

#[derive(Debug, Clone)]
pub struct AnswerSheet {
    test_id: i64,
    /// Question ids in display order, each with its answer ids
    questions: Vec<(i64, Vec<i64>)>,
    selections: HashMap<i64, i64>,
}

impl AnswerSheet {
    pub fn new(test: &Test) -> Self {
        Self {
            test_id: test.id,
            questions: test
                .questions
                .iter()
                .map(|q| (q.id, q.answers.iter().map(|a| a.id).collect()))
                .collect(),
            selections: HashMap::new(),
        }
    }

    pub fn test_id(&self) -> i64 {
        self.test_id
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn answered(&self) -> usize {
        self.selections.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == self.total()
    }

    /// Select an answer, replacing any previous choice for the question.
    pub fn select(&mut self, question_id: i64, answer_id: i64) -> Result<(), QuizError> {
        let (_, answers) = self
            .questions
            .iter()
            .find(|(id, _)| *id == question_id)
            .ok_or(QuizError::UnknownQuestion(question_id))?;
        if !answers.contains(&answer_id) {
            return Err(QuizError::UnknownAnswer {
                question_id,
                answer_id,
            });
        }
        self.selections.insert(question_id, answer_id);
        Ok(())
    }

    pub fn selected(&self, question_id: i64) -> Option<i64> {
        self.selections.get(&question_id).copied()
    }

    /// Index of the first question without an answer
    pub fn first_unanswered(&self) -> Option<usize> {
        self.questions
            .iter()
            .position(|(id, _)| !self.selections.contains_key(id))
    }

    /// Build the submission in question order.
    pub fn collect(&self) -> Result<Vec<AnswerSelection>, QuizError> {
        let answers: Vec<AnswerSelection> = self
            .questions
            .iter()
            .filter_map(|(question_id, _)| {
                self.selected(*question_id).map(|answer_id| AnswerSelection {
                    question_id: *question_id,
                    answer_id,
                })
            })
            .collect();

        if answers.len() != self.total() {
            return Err(QuizError::Incomplete {
                answered: answers.len(),
                total: self.total(),
            });
        }
        Ok(answers)
    }
}

/// What the front end shows after a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    /// A certificate was issued; open its page
    Certificate { certificate_id: String },
    /// Pass/fail block with the score
    Summary { passed: bool, score: f64 },
}

impl TestOutcome {
    pub fn from_result(result: &TestResult) -> Self {
        match result.certificate_id.as_deref() {
            Some(id) if !id.is_empty() => TestOutcome::Certificate {
                certificate_id: id.to_string(),
            },
            _ => TestOutcome::Summary {
                passed: result.passed,
                score: result.score,
            },
        }
    }

    /// Web path to navigate to, if any
    pub fn redirect_path(&self) -> Option<String> {
        match self {
            TestOutcome::Certificate { certificate_id } => Some(certificate_path(certificate_id)),
            TestOutcome::Summary { .. } => None,
        }
    }
}

/// `/certificates/{id}/`
pub fn certificate_path(certificate_id: &str) -> String {
    format!("/certificates/{}/", certificate_id)
}

/// Score with one decimal place, e.g. `66.7%`
pub fn format_score(score: f64) -> String {
    format!("{:.1}%", score)
}
