//! Form state machine for one rendered survey session.

use survey_api::{AnswersShape, SurveyApi};
use survey_core::{Campaign, RuntimeEnvironment, SubmissionRecord, SurveyError};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Layout;
use crate::fields::{form_fields, validate, FieldError, FormField, FormValues};
use crate::loader::load_campaign;
use crate::submit::{SubmissionOrchestrator, SubmitFailure};

pub const SUCCESS_TOAST: &str = "Survey submitted successfully!";
pub const FAILURE_TOAST: &str = "Failed to submit survey. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Loading,
    Ready,
    Submitting,
    Submitted,
    Error(SurveyError),
}

impl FormState {
    pub fn name(&self) -> &'static str {
        match self {
            FormState::Idle => "idle",
            FormState::Loading => "loading",
            FormState::Ready => "ready",
            FormState::Submitting => "submitting",
            FormState::Submitted => "submitted",
            FormState::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: &'static str,
}

/// The single view a session shows.
#[derive(Debug, Clone, PartialEq)]
pub enum FormView<'a> {
    Loading,
    Error(SurveyError),
    Success { reward_details: Option<&'a str> },
    Form {
        campaign: &'a Campaign,
        fields: Vec<FormField>,
        submitting: bool,
    },
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("a submission is already in flight")]
    InFlight,
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(SubmissionRecord),
    /// Transient failure; the form stays up with an error toast.
    Retry,
    Terminal(SurveyError),
}

#[derive(Debug, Clone)]
pub struct FormSession {
    token: String,
    layout: Layout,
    state: FormState,
    campaign: Option<Campaign>,
    values: FormValues,
    opted_out: bool,
    field_errors: Vec<FieldError>,
    toast: Option<Toast>,
}

impl FormSession {
    pub fn new(token: impl Into<String>, layout: Layout) -> Self {
        Self {
            token: token.into(),
            layout,
            state: FormState::Idle,
            campaign: None,
            values: FormValues::new(),
            opted_out: false,
            field_errors: Vec::new(),
            toast: None,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn campaign(&self) -> Option<&Campaign> {
        self.campaign.as_ref()
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn opted_out(&self) -> bool {
        self.opted_out
    }

    pub fn field_error(&self, field: &str) -> Option<&'static str> {
        self.field_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }

    pub fn toast(&self) -> Option<Toast> {
        self.toast
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    /// Precedence: loading, error, submitted, form, then nothing.
    pub fn view(&self) -> FormView<'_> {
        match (&self.state, &self.campaign) {
            (FormState::Loading, _) => FormView::Loading,
            (FormState::Error(err), _) => FormView::Error(*err),
            (FormState::Submitted, campaign) => FormView::Success {
                reward_details: campaign
                    .as_ref()
                    .and_then(|c| c.contest_details(self.opted_out)),
            },
            (FormState::Ready | FormState::Submitting, Some(campaign)) => FormView::Form {
                campaign,
                fields: form_fields(campaign, self.opted_out),
                submitting: self.state == FormState::Submitting,
            },
            (FormState::Ready | FormState::Submitting | FormState::Idle, _) => FormView::Empty,
        }
    }

    pub fn begin_load(&mut self) -> Result<(), TransitionError> {
        self.require(FormState::Idle, "load")?;
        self.state = FormState::Loading;
        Ok(())
    }

    pub fn finish_load(&mut self, result: Result<Campaign, SurveyError>) -> Result<(), TransitionError> {
        self.require(FormState::Loading, "finish loading")?;
        match result {
            Ok(campaign) => {
                self.campaign = Some(campaign);
                self.state = FormState::Ready;
            }
            Err(err) => self.state = FormState::Error(err),
        }
        Ok(())
    }

    /// Entered once per session; a failed load is terminal until a new session.
    pub async fn load(&mut self, api: &dyn SurveyApi) -> Result<(), TransitionError> {
        self.begin_load()?;
        let result = load_campaign(api, &self.token).await;
        self.finish_load(result)
    }

    pub fn set_opted_out(&mut self, opted_out: bool) -> Result<(), TransitionError> {
        self.require(FormState::Ready, "change the contest choice")?;
        self.opted_out = opted_out;
        Ok(())
    }

    pub fn update_values(&mut self, values: FormValues) -> Result<(), TransitionError> {
        self.require(FormState::Ready, "edit answers")?;
        self.values = values;
        Ok(())
    }

    /// Validates and moves to `Submitting`; invalid input keeps the form `Ready`.
    pub fn begin_submit(&mut self) -> Result<(), TransitionError> {
        if self.state == FormState::Submitting {
            return Err(TransitionError::InFlight);
        }
        self.require(FormState::Ready, "submit")?;
        let Some(campaign) = &self.campaign else {
            return Err(TransitionError::InvalidState {
                action: "submit",
                state: "without a campaign",
            });
        };

        let errors = validate(campaign, &self.values, self.opted_out);
        self.field_errors = errors.clone();
        if !errors.is_empty() {
            debug!(token = %self.token, errors = errors.len(), "submission blocked by validation");
            return Err(TransitionError::Invalid(errors));
        }

        self.toast = None;
        self.state = FormState::Submitting;
        Ok(())
    }

    pub fn finish_submit(
        &mut self,
        result: Result<SubmissionRecord, SubmitFailure>,
    ) -> Result<SubmitOutcome, TransitionError> {
        self.require(FormState::Submitting, "finish submitting")?;
        let outcome = match result {
            Ok(record) => {
                self.state = FormState::Submitted;
                self.toast = Some(Toast {
                    kind: ToastKind::Success,
                    message: SUCCESS_TOAST,
                });
                SubmitOutcome::Submitted(record)
            }
            Err(SubmitFailure::Terminal(err)) => {
                self.state = FormState::Error(err);
                SubmitOutcome::Terminal(err)
            }
            Err(SubmitFailure::Transient { reason }) => {
                info!(token = %self.token, %reason, "submission can be retried");
                self.state = FormState::Ready;
                self.toast = Some(Toast {
                    kind: ToastKind::Error,
                    message: FAILURE_TOAST,
                });
                SubmitOutcome::Retry
            }
        };
        Ok(outcome)
    }

    pub async fn submit(
        &mut self,
        api: &dyn SurveyApi,
        env: &dyn RuntimeEnvironment,
        shape: AnswersShape,
    ) -> Result<SubmitOutcome, TransitionError> {
        self.begin_submit()?;
        let result = match &self.campaign {
            Some(campaign) => {
                let contact = self.values.contact();
                SubmissionOrchestrator::new(api, env, shape)
                    .submit(campaign, &self.token, Some(&contact), &self.values, self.opted_out)
                    .await
            }
            None => Err(SubmitFailure::Transient {
                reason: "no campaign loaded".to_string(),
            }),
        };
        self.finish_submit(result)
    }

    fn require(&self, expected: FormState, action: &'static str) -> Result<(), TransitionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                action,
                state: self.state.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{EMAIL_FIELD, NAME_FIELD, PHONE_FIELD};
    use crate::submit::tests::{fixed_env, RecordingApi};
    use serde_json::json;
    use survey_api::{CampaignBasicData, QuestionsPage};

    fn wire_campaign(reward: bool) -> (CampaignBasicData, QuestionsPage) {
        let mut basic = json!({"title": "Guest Feedback", "active": true});
        if reward {
            basic["reward"] = json!({"id": 1, "title": "Gift card", "description": "$50"});
            basic["rewardDetailsText"] = json!("Winners drawn January 3rd.");
        }
        let questions = json!({
            "member": [{"id": 1, "questionText": "Recommend?", "questionType": "yesno", "sortOrder": 1, "required": true}],
            "totalItems": 1
        });
        (
            serde_json::from_value(basic).unwrap(),
            serde_json::from_value(questions).unwrap(),
        )
    }

    async fn ready_session(api: &RecordingApi) -> FormSession {
        let mut session = FormSession::new("tok", Layout::Full);
        session.load(api).await.expect("load transition");
        assert_eq!(session.state(), FormState::Ready);
        session
    }

    fn answer(session: &mut FormSession, pairs: &[(&str, &str)]) {
        let values = FormValues::from_pairs(
            session.campaign().expect("campaign"),
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        );
        session.update_values(values).expect("ready");
    }

    #[test]
    fn view_precedence_follows_state() {
        let mut session = FormSession::new("tok", Layout::Compact);
        assert_eq!(session.view(), FormView::Empty);
        session.begin_load().unwrap();
        assert_eq!(session.view(), FormView::Loading);
        session.finish_load(Err(SurveyError::InvalidParameters)).unwrap();
        assert_eq!(session.view(), FormView::Error(SurveyError::InvalidParameters));
    }

    #[test]
    fn loading_happens_once() {
        let mut session = FormSession::new("tok", Layout::Full);
        session.begin_load().unwrap();
        session.finish_load(Err(SurveyError::CampaignInactive)).unwrap();
        assert!(matches!(
            session.begin_load(),
            Err(TransitionError::InvalidState { action: "load", .. })
        ));
        assert_eq!(session.state(), FormState::Error(SurveyError::CampaignInactive));
    }

    #[tokio::test]
    async fn end_to_end_yes_no_submission() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(false)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        answer(&mut session, &[("question_1", "yes")]);

        let outcome = session
            .submit(&api, &fixed_env(), AnswersShape::List)
            .await
            .expect("submit");
        assert_eq!(outcome, SubmitOutcome::Submitted(SubmissionRecord { id: 501 }));
        assert_eq!(session.state(), FormState::Submitted);
        assert_eq!(session.view(), FormView::Success { reward_details: None });
        assert_eq!(session.toast().map(|t| t.message), Some(SUCCESS_TOAST));

        let basic = api.basic_calls.lock().unwrap();
        assert_eq!(basic[0]["rewardOptIn"], json!(false));
        assert_eq!(basic[0]["workplace"], json!(""));
        assert_eq!(basic[0]["uniqueUrlToken"], json!("tok"));
        assert_eq!(basic[0]["metadataJson"].as_array().map(Vec::len), Some(1));
        let answers = api.answer_calls.lock().unwrap();
        assert_eq!(answers[0].1, json!({"answers": [{"questionId": 1, "answer": "yes"}]}));
    }

    #[tokio::test]
    async fn validation_failure_stays_ready_without_network() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(true)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        answer(&mut session, &[("question_1", "yes"), (EMAIL_FIELD, "nope")]);

        let err = session
            .submit(&api, &fixed_env(), AnswersShape::List)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid(ref errors) if errors.len() == 3));
        assert_eq!(session.state(), FormState::Ready);
        assert_eq!(session.field_error(NAME_FIELD), Some("Please enter your name"));
        assert_eq!(session.field_error(PHONE_FIELD), Some("Please enter your phone number"));
        assert!(api.basic_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_shows_toast_and_allows_retry() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(false)),
            fail_basic: Some((503, None)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        answer(&mut session, &[("question_1", "no")]);

        let outcome = session
            .submit(&api, &fixed_env(), AnswersShape::List)
            .await
            .expect("submit");
        assert_eq!(outcome, SubmitOutcome::Retry);
        assert_eq!(session.state(), FormState::Ready);
        assert!(matches!(session.view(), FormView::Form { submitting: false, .. }));
        assert_eq!(
            session.toast(),
            Some(Toast {
                kind: ToastKind::Error,
                message: FAILURE_TOAST
            })
        );
        session.dismiss_toast();
        assert!(session.toast().is_none());

        // A retry takes a fresh metadata snapshot.
        let retry = session
            .submit(&api, &survey_core::StaticEnvironment::new("curl/8", "/"), AnswersShape::List)
            .await
            .expect("retry");
        assert_eq!(retry, SubmitOutcome::Retry);
        let basic = api.basic_calls.lock().unwrap();
        assert_eq!(basic.len(), 2);
        assert_ne!(basic[0]["metadataJson"], basic[1]["metadataJson"]);
    }

    #[tokio::test]
    async fn rate_limited_submit_is_terminal() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(false)),
            fail_basic: Some((429, None)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        answer(&mut session, &[("question_1", "yes")]);

        let outcome = session
            .submit(&api, &fixed_env(), AnswersShape::List)
            .await
            .expect("submit");
        assert_eq!(outcome, SubmitOutcome::Terminal(SurveyError::TooManyAttempts));
        assert_eq!(session.view(), FormView::Error(SurveyError::TooManyAttempts));
        assert!(session.set_opted_out(true).is_err());
    }

    #[tokio::test]
    async fn submitted_is_absorbing_and_in_flight_is_refused() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(true)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        session.set_opted_out(true).unwrap();
        answer(&mut session, &[("question_1", "yes")]);

        session.begin_submit().expect("valid");
        assert!(matches!(session.view(), FormView::Form { submitting: true, .. }));
        assert_eq!(session.begin_submit(), Err(TransitionError::InFlight));

        session
            .finish_submit(Ok(SubmissionRecord { id: 9 }))
            .expect("finish");
        // Opted out, so the reward text is not shown.
        assert_eq!(session.view(), FormView::Success { reward_details: None });
        assert!(matches!(
            session.begin_submit(),
            Err(TransitionError::InvalidState { state: "submitted", .. })
        ));
    }

    #[tokio::test]
    async fn success_panel_shows_reward_text_for_entrants() {
        let api = RecordingApi {
            campaign: Some(wire_campaign(true)),
            ..Default::default()
        };
        let mut session = ready_session(&api).await;
        answer(
            &mut session,
            &[
                ("question_1", "yes"),
                (NAME_FIELD, "Ada Guest"),
                (EMAIL_FIELD, "ada@example.com"),
                (PHONE_FIELD, "555-010-0100"),
            ],
        );
        session
            .submit(&api, &fixed_env(), AnswersShape::List)
            .await
            .expect("submit");
        assert_eq!(
            session.view(),
            FormView::Success {
                reward_details: Some("Winners drawn January 3rd.")
            }
        );
        let basic = api.basic_calls.lock().unwrap();
        assert_eq!(basic[0]["rewardOptIn"], json!(true));
        assert_eq!(basic[0]["name"], json!("Ada Guest"));
    }
}
