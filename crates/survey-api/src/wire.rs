//! JSON shapes exchanged with the feedback API.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use survey_core::{Answer, AnswerValue, SubmissionMetadata};

/// `{status, code, data}` wrapper around every successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: Option<String>,
    pub code: Option<JsonValue>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBasicData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_details_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<WireReward>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workplace: Option<WireWorkplace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Absent means inactive.
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_connect_setting: Option<GuestConnectSetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireReward {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub iri: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireWorkplace {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub iri: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestConnectSetting {
    #[serde(default)]
    pub disclaimer_text: Option<String>,
    #[serde(default)]
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsPage {
    #[serde(default)]
    pub member: Vec<ApiQuestion>,
    #[serde(default)]
    pub total_items: Option<u64>,
}

/// Question ids arrive as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Num(i64),
    Str(String),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            WireId::Num(n) => n.to_string(),
            WireId::Str(s) => s,
        }
    }
}

impl From<i64> for WireId {
    fn from(value: i64) -> Self {
        WireId::Num(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuestion {
    pub id: WireId,
    pub question_text: String,
    pub question_type: String,
    pub sort_order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Phase-1 body. Contact fields are present only for contest entrants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicSubmissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub reward_opt_in: bool,
    pub metadata_json: Vec<SubmissionMetadata>,
    pub workplace: String,
    pub unique_url_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicSubmissionResponse {
    pub id: i64,
    #[serde(default)]
    pub reward_opt_in: Option<bool>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedAnswer {
    pub question_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerList {
    pub answers: Vec<ListedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedAnswer {
    pub question_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnswerValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEnvelope {
    pub unique_url_token: String,
    pub feedback_submission_id: i64,
    pub answers: Vec<ValuedAnswer>,
}

/// Phase-2 body in either of the two shapes the server has been seen to take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswersPayload {
    Envelope(AnswerEnvelope),
    List(AnswerList),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswersShape {
    /// `{answers:[{questionId, answer}]}`
    #[default]
    List,
    /// `{uniqueUrlToken, feedbackSubmissionId, answers:[{questionId, value}]}`
    Envelope,
}

impl AnswersShape {
    pub fn build(&self, token: &str, submission_id: i64, answers: Vec<Answer>) -> AnswersPayload {
        match self {
            AnswersShape::List => AnswersPayload::List(AnswerList {
                answers: answers
                    .into_iter()
                    .map(|a| ListedAnswer {
                        question_id: a.question_id,
                        answer: a.value,
                    })
                    .collect(),
            }),
            AnswersShape::Envelope => AnswersPayload::Envelope(AnswerEnvelope {
                unique_url_token: token.to_string(),
                feedback_submission_id: submission_id,
                answers: answers
                    .into_iter()
                    .map(|a| ValuedAnswer {
                        question_id: a.question_id,
                        value: a.value,
                    })
                    .collect(),
            }),
        }
    }
}

impl std::str::FromStr for AnswersShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "answers" | "list" => Ok(AnswersShape::List),
            "envelope" => Ok(AnswersShape::Envelope),
            other => Err(format!("unknown answers payload shape `{other}`")),
        }
    }
}
