//! Core domain model for the campaign survey form.

use std::fmt;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

pub mod metadata;
pub mod validate;

pub use metadata::{
    campaign_token, capture_metadata, classify_browser, classify_device, extract_token,
    RuntimeEnvironment, StaticEnvironment,
};

pub const CRATE_NAME: &str = "survey-core";

/// Fixed rating scale shown for every rating question.
pub const RATING_SCALE: [(i64, &str); 5] = [
    (1, "Poor"),
    (2, "Fair"),
    (3, "Average"),
    (4, "Good"),
    (5, "Excellent"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    Rating,
    Text,
    MultipleChoice,
    YesNo,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Rating => "rating",
            QuestionType::Text => "text",
            QuestionType::MultipleChoice => "multipleChoice",
            QuestionType::YesNo => "yesNo",
        }
    }
}

/// Renderable question. The id is kept as a string and re-parsed on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub kind: QuestionType,
    pub prompt: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl Question {
    /// Form field name carrying this question's value.
    pub fn field_name(&self) -> String {
        format!("question_{}", self.id)
    }

    pub fn numeric_id(&self) -> Result<i64, ParseIntError> {
        self.id.trim().parse()
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Workplace {
    /// IRI reference (`@id`) sent back with the submission.
    pub iri: Option<String>,
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Branding {
    pub logo_path: Option<String>,
    pub disclaimer_text: Option<String>,
}

/// A fully loaded campaign: basic info merged with its ordered questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub token: String,
    pub title: String,
    pub active: bool,
    pub reward: Option<Reward>,
    pub reward_details_text: Option<String>,
    pub workplace: Option<Workplace>,
    pub winners_count: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub branding: Option<Branding>,
    pub questions: Vec<Question>,
}

impl Campaign {
    pub fn has_reward(&self) -> bool {
        self.reward.is_some()
    }

    /// True when contact details are collected and the respondent enters the contest.
    pub fn reward_participation(&self, opted_out: bool) -> bool {
        self.has_reward() && !opted_out
    }

    /// Workplace reference for the submission payload, empty when unknown.
    pub fn workplace_ref(&self) -> &str {
        self.workplace
            .as_ref()
            .and_then(|w| w.iri.as_deref())
            .unwrap_or_default()
    }

    pub fn logo_url(&self, image_base_url: &str) -> Option<String> {
        let path = self
            .branding
            .as_ref()
            .and_then(|b| b.logo_path.as_deref())
            .filter(|p| !p.trim().is_empty())?;
        Some(format!("{image_base_url}{path}"))
    }

    pub fn disclaimer(&self) -> Option<&str> {
        self.branding
            .as_ref()
            .and_then(|b| b.disclaimer_text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Contest text shown to entrants; hidden once they opt out.
    pub fn contest_details(&self, opted_out: bool) -> Option<&str> {
        if !self.reward_participation(opted_out) {
            return None;
        }
        self.reward_details_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Scalar answer value: integers for ratings, strings for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(i64),
    Text(String),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s),
            AnswerValue::Number(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Number(n) => write!(f, "{n}"),
            AnswerValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub value: Option<AnswerValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Tablet => "Tablet",
            DeviceClass::Desktop => "Desktop",
        }
    }
}

/// Environment snapshot taken once per submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub timestamp: String,
    pub browser: String,
    pub device: DeviceClass,
    pub user_agent: String,
}

/// Server-assigned identifier from the first submission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
}

/// Error states that replace the form (or, for `SubmissionError`, a failed submit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyError {
    CampaignInactive,
    AlreadyEnteredToday,
    TooManyAttempts,
    InvalidParameters,
    SubmissionError,
}

impl SurveyError {
    pub fn code(&self) -> &'static str {
        match self {
            SurveyError::CampaignInactive => "CAMPAIGN_INACTIVE",
            SurveyError::AlreadyEnteredToday => "ALREADY_ENTERED_TODAY",
            SurveyError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            SurveyError::InvalidParameters => "INVALID_PARAMETERS",
            SurveyError::SubmissionError => "SUBMISSION_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SurveyError::CampaignInactive => "This Feedback Survey is Not Active",
            SurveyError::AlreadyEnteredToday => "You have already entered this contest today",
            SurveyError::TooManyAttempts => {
                "You have made too many attempts to submit this Survey"
            }
            SurveyError::InvalidParameters => "Invalid survey parameters. Please check your link.",
            SurveyError::SubmissionError => {
                "An error occurred while submitting your survey. Please try again."
            }
        }
    }
}

impl fmt::Display for SurveyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
