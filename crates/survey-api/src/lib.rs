//! Feedback API transport: wire types, the `SurveyApi` seam, and a reqwest client.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

pub mod mapper;
pub mod wire;

pub use mapper::{map_question_type, map_questions, merge_campaign};
pub use wire::{
    AnswersPayload, AnswersShape, ApiEnvelope, ApiQuestion, BasicSubmissionPayload,
    BasicSubmissionResponse, CampaignBasicData, QuestionsPage, WireId,
};

pub const CRATE_NAME: &str = "survey-api";

/// Body code the server uses for a duplicate same-day entry.
pub const ALREADY_SUBMITTED_CODE: &str = "ALREADY_SUBMITTED";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    Status {
        status: u16,
        body_code: Option<String>,
        url: String,
    },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("response from {url} carried no data")]
    MissingData { url: String },
    #[error("`{token}` is not a usable campaign token")]
    InvalidToken { token: String },
}

impl FetchError {
    pub fn status(status: u16, body_code: Option<&str>) -> Self {
        FetchError::Status {
            status,
            body_code: body_code.map(str::to_string),
            url: String::new(),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { .. }
            | FetchError::Decode { .. }
            | FetchError::MissingData { .. }
            | FetchError::InvalidToken { .. } => None,
        }
    }

    pub fn body_code(&self) -> Option<&str> {
        match self {
            FetchError::Status { body_code, .. } => body_code.as_deref(),
            FetchError::Transport { .. }
            | FetchError::Decode { .. }
            | FetchError::MissingData { .. }
            | FetchError::InvalidToken { .. } => None,
        }
    }
}

/// Top-level string `code` of an error body, if the body is JSON and has one.
pub fn body_code_of(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("code")?.as_str().map(str::to_string)
}

/// Remote operations the survey form depends on.
#[async_trait]
pub trait SurveyApi: Send + Sync {
    async fn fetch_campaign_basic(&self, token: &str) -> Result<CampaignBasicData, FetchError>;

    async fn fetch_campaign_questions(&self, token: &str) -> Result<QuestionsPage, FetchError>;

    async fn submit_basic(
        &self,
        payload: &BasicSubmissionPayload,
    ) -> Result<BasicSubmissionResponse, FetchError>;

    async fn submit_answers(
        &self,
        submission_id: i64,
        payload: &AnswersPayload,
    ) -> Result<(), FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://guestconnect.stage.byod.ai/api".to_string(),
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSurveyApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSurveyApi {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid api base url `{}`", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("api base url `{base_url}` cannot carry a path");
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends each segment percent-encoded, so a token can never leave its segment.
    pub fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn token_endpoint(&self, prefix: &[&str], token: &str) -> Result<String, FetchError> {
        if token.is_empty() || token == "." || token == ".." {
            return Err(FetchError::InvalidToken {
                token: token.to_string(),
            });
        }
        let mut segments = prefix.to_vec();
        segments.push(token);
        Ok(self.endpoint(&segments))
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let body_code = body_code_of(&String::from_utf8_lossy(&body));
        info!(status = status.as_u16(), body_code = ?body_code, "api rejected request");
        Err(FetchError::Status {
            status: status.as_u16(),
            body_code,
            url: url.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, FetchError> {
        serde_json::from_slice(body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_data<T: DeserializeOwned>(&self, url: String) -> Result<Option<T>, FetchError> {
        let span = info_span!("api_call", method = "GET", url = %url);
        async {
            let body = self.send(self.client.get(&url), &url).await?;
            let envelope: ApiEnvelope<T> = Self::decode(&url, &body)?;
            Ok(envelope.data)
        }
        .instrument(span)
        .await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, payload: &B) -> Result<Vec<u8>, FetchError> {
        let span = info_span!("api_call", method = "POST", url = %url);
        self.send(self.client.post(url).json(payload), url)
            .instrument(span)
            .await
    }
}

#[async_trait]
impl SurveyApi for HttpSurveyApi {
    async fn fetch_campaign_basic(&self, token: &str) -> Result<CampaignBasicData, FetchError> {
        let url = self.token_endpoint(&["feedback", "campaign", "basic"], token)?;
        self.get_data(url.clone())
            .await?
            .ok_or(FetchError::MissingData { url })
    }

    async fn fetch_campaign_questions(&self, token: &str) -> Result<QuestionsPage, FetchError> {
        let url = self.token_endpoint(&["feedback", "campaign", "questions"], token)?;
        Ok(self.get_data(url).await?.unwrap_or_default())
    }

    async fn submit_basic(
        &self,
        payload: &BasicSubmissionPayload,
    ) -> Result<BasicSubmissionResponse, FetchError> {
        let url = self.endpoint(&["feedback", "submission", "basic"]);
        let body = self.post_json(&url, payload).await?;
        let envelope: ApiEnvelope<BasicSubmissionResponse> = Self::decode(&url, &body)?;
        envelope.data.ok_or(FetchError::MissingData { url })
    }

    async fn submit_answers(
        &self,
        submission_id: i64,
        payload: &AnswersPayload,
    ) -> Result<(), FetchError> {
        let id = submission_id.to_string();
        let url = self.endpoint(&["feedback", "submission", &id, "answers"]);
        self.post_json(&url, payload).await?;
        Ok(())
    }
}

/// True for the server's rate-limit rejection.
pub fn is_rate_limited(status: u16) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS.as_u16()
}
