//! Two-phase submission: create the submission record, then attach answers.

use survey_api::{AnswersShape, BasicSubmissionPayload, FetchError, SurveyApi};
use survey_core::{
    capture_metadata, Answer, Campaign, ContactInfo, RuntimeEnvironment, SubmissionRecord,
    SurveyError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::fields::FormValues;
use crate::loader::{classify_failure, FailureKind};

#[derive(Debug, Error)]
pub enum SubmitFailure {
    /// Rate-limit or duplicate rejection; the form is replaced by an error panel.
    #[error("submission rejected: {0}")]
    Terminal(SurveyError),
    /// Anything else; the respondent stays on the form and may retry.
    #[error("submission failed: {reason}")]
    Transient { reason: String },
}

impl SubmitFailure {
    fn from_fetch(err: &FetchError) -> Self {
        match classify_failure(err) {
            FailureKind::RateLimited => SubmitFailure::Terminal(SurveyError::TooManyAttempts),
            FailureKind::AlreadySubmitted => {
                SubmitFailure::Terminal(SurveyError::AlreadyEnteredToday)
            }
            FailureKind::Other => SubmitFailure::Transient {
                reason: err.to_string(),
            },
        }
    }
}

pub fn build_basic_payload(
    campaign: &Campaign,
    token: &str,
    contact: Option<&ContactInfo>,
    opted_out: bool,
    env: &dyn RuntimeEnvironment,
) -> BasicSubmissionPayload {
    let participating = campaign.reward_participation(opted_out);
    let contact = contact.filter(|_| participating);
    BasicSubmissionPayload {
        name: contact.map(|c| c.name.clone()),
        email: contact.map(|c| c.email.clone()),
        phone: contact.map(|c| c.phone.clone()),
        reward_opt_in: participating,
        metadata_json: vec![capture_metadata(env)],
        workplace: campaign.workplace_ref().to_string(),
        unique_url_token: token.to_string(),
    }
}

/// One answer per campaign question, in question order.
pub fn build_answers(campaign: &Campaign, values: &FormValues) -> Result<Vec<Answer>, SubmitFailure> {
    campaign
        .questions
        .iter()
        .map(|question| {
            let question_id = question.numeric_id().map_err(|err| SubmitFailure::Transient {
                reason: format!("question id `{}` is not numeric: {err}", question.id),
            })?;
            Ok(Answer {
                question_id,
                value: values.answer_for(question),
            })
        })
        .collect()
}

pub struct SubmissionOrchestrator<'a> {
    api: &'a dyn SurveyApi,
    env: &'a dyn RuntimeEnvironment,
    shape: AnswersShape,
}

impl<'a> SubmissionOrchestrator<'a> {
    pub fn new(api: &'a dyn SurveyApi, env: &'a dyn RuntimeEnvironment, shape: AnswersShape) -> Self {
        Self { api, env, shape }
    }

    /// Not transactional: a phase-2 failure leaves the phase-1 record behind.
    pub async fn submit(
        &self,
        campaign: &Campaign,
        token: &str,
        contact: Option<&ContactInfo>,
        values: &FormValues,
        opted_out: bool,
    ) -> Result<SubmissionRecord, SubmitFailure> {
        // Ids are checked before anything is written.
        let answers = build_answers(campaign, values)?;
        let payload = build_basic_payload(campaign, token, contact, opted_out, self.env);

        let created = self.api.submit_basic(&payload).await.map_err(|err| {
            warn!(token, error = %err, "submission phase 1 failed");
            SubmitFailure::from_fetch(&err)
        })?;
        let record = SubmissionRecord { id: created.id };
        info!(token, submission_id = record.id, opt_in = payload.reward_opt_in, "submission created");

        let body = self.shape.build(token, record.id, answers);
        self.api
            .submit_answers(record.id, &body)
            .await
            .map_err(|err| {
                warn!(
                    token,
                    submission_id = record.id,
                    error = %err,
                    "submission phase 2 failed; record left without answers"
                );
                SubmitFailure::from_fetch(&err)
            })?;

        info!(token, submission_id = record.id, "answers attached");
        Ok(record)
    }
}
