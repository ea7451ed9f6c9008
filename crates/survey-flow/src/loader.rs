//! Campaign loading: concurrent fetch, merge, and failure classification.

use survey_api::{
    is_rate_limited, map_questions, merge_campaign, FetchError, SurveyApi, ALREADY_SUBMITTED_CODE,
};
use survey_core::{Campaign, SurveyError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    AlreadySubmitted,
    Other,
}

/// Status 429 wins over the body code; anything unrecognized is `Other`.
pub fn classify_failure(err: &FetchError) -> FailureKind {
    match err {
        FetchError::Status { status, .. } if is_rate_limited(*status) => FailureKind::RateLimited,
        FetchError::Status {
            body_code: Some(code),
            ..
        } if code == ALREADY_SUBMITTED_CODE => FailureKind::AlreadySubmitted,
        FetchError::Status { .. }
        | FetchError::Transport { .. }
        | FetchError::Decode { .. }
        | FetchError::MissingData { .. }
        | FetchError::InvalidToken { .. } => FailureKind::Other,
    }
}

pub fn load_error(err: &FetchError) -> SurveyError {
    match classify_failure(err) {
        FailureKind::RateLimited => SurveyError::TooManyAttempts,
        FailureKind::AlreadySubmitted => SurveyError::AlreadyEnteredToday,
        FailureKind::Other => SurveyError::InvalidParameters,
    }
}

/// Both fetches must succeed; an inactive campaign is rejected after loading.
pub async fn load_campaign(api: &dyn SurveyApi, token: &str) -> Result<Campaign, SurveyError> {
    let (basic, page) = tokio::try_join!(
        api.fetch_campaign_basic(token),
        api.fetch_campaign_questions(token)
    )
    .map_err(|err| {
        let classified = load_error(&err);
        warn!(token, error = %err, code = classified.code(), "campaign load failed");
        classified
    })?;

    if !basic.active {
        info!(token, "campaign is not active");
        return Err(SurveyError::CampaignInactive);
    }

    let questions = map_questions(page.member);
    info!(token, questions = questions.len(), "campaign loaded");
    Ok(merge_campaign(token, basic, questions))
}
