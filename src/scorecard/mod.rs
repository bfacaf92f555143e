//! Scorecard domain model and PDF report rendering.
//!
//! The submission decoded from the request body is the richest wire shape the
//! assessment front end produces: structured category scores plus
//! recommendations carrying a completion status. `html_content` is accepted
//! for compatibility with older front ends but the structured fields are
//! what the layout engine renders.

pub mod layout;
pub mod pdf;
pub mod policy;

use serde::Deserialize;

/// One scorecard assessment result, received once per request and immutable
/// after decode.
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentSubmission {
    pub email: String,
    #[serde(default, rename = "htmlContent")]
    pub html_content: Option<String>,
    #[serde(default)]
    pub score: u8,
    #[serde(default, rename = "categoryScores")]
    pub category_scores: Vec<CategoryScore>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Per-category result. The percentage is trusted as supplied; it is not
/// recomputed from score/max.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub score: f64,
    pub max: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recommendation {
    pub category: String,
    #[serde(default)]
    pub question: String,
    pub text: String,
    pub status: RecommendationStatus,
}

/// Completion status of the control a recommendation refers to. Implemented
/// controls are never shown in the improvement sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Missing,
    Partial,
    Implemented,
}
