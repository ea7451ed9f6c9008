//! Template structs and the flat view models the templates iterate over.

use askama::Template;
use survey_core::validate::format_phone_number;
use survey_flow::fields::PHONE_FIELD;
use survey_flow::{Control, FormField, FormSession, FormView, ToastKind};

pub const THANK_YOU: &str = "Thank you for your feedback!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: &'static str,
    pub input_type: &'static str,
    pub placeholder: &'static str,
    pub max_length: String,
    pub rows: u8,
    pub options: Vec<OptionView>,
    pub value: String,
    pub checked: bool,
    pub error: &'static str,
}

impl FieldView {
    fn new(field: FormField, session: &FormSession) -> Self {
        let current = session
            .values()
            .get(&field.name)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let mut view = FieldView {
            error: session.field_error(&field.name).unwrap_or_default(),
            name: field.name,
            label: field.label,
            required: field.required,
            kind: "",
            input_type: "",
            placeholder: "",
            max_length: String::new(),
            rows: 0,
            options: Vec::new(),
            value: String::new(),
            checked: false,
        };
        let option = |value: String, label: String| OptionView {
            checked: value == current,
            value,
            label,
        };

        match field.control {
            Control::Rating { choices } => {
                view.kind = "rating";
                view.options = choices
                    .into_iter()
                    .map(|(n, label)| option(n.to_string(), format!("{n} - {label}")))
                    .collect();
            }
            Control::YesNo => {
                view.kind = "choice";
                view.options = vec![
                    option("yes".into(), "Yes".into()),
                    option("no".into(), "No".into()),
                ];
            }
            Control::Choice { options } => {
                view.kind = "choice";
                view.options = options.into_iter().map(|o| option(o.clone(), o)).collect();
            }
            Control::TextArea { rows, placeholder } => {
                view.kind = "textarea";
                view.rows = rows;
                view.placeholder = placeholder;
                view.value = current;
            }
            Control::Input {
                input_type,
                placeholder,
                max_length,
            } => {
                view.kind = "input";
                view.input_type = input_type;
                view.placeholder = placeholder;
                view.max_length = max_length.map(|n| n.to_string()).unwrap_or_default();
                view.value = if view.name == PHONE_FIELD {
                    format_phone_number(&current)
                } else {
                    current
                };
            }
            Control::Checkbox { label } => {
                view.kind = "checkbox";
                view.label = label.to_string();
                view.checked = session.opted_out();
            }
        }
        view
    }
}

#[derive(Template)]
#[template(path = "survey.html")]
pub struct SurveyTemplate {
    pub page_title: String,
    pub layout: &'static str,
    pub token: String,
    pub session_id: String,
    pub panel: &'static str,
    pub logo_url: String,
    pub disclaimer: String,
    pub error_message: &'static str,
    pub thank_you: &'static str,
    pub reward_details: String,
    pub contest_details: String,
    pub fields: Vec<FieldView>,
    pub submitting: bool,
    pub toast_kind: &'static str,
    pub toast_message: &'static str,
}

impl SurveyTemplate {
    pub fn for_session(session: &FormSession, session_id: &str, image_base_url: &str) -> Self {
        let campaign = session.campaign();
        let mut tpl = SurveyTemplate {
            page_title: campaign
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "Feedback Survey".to_string()),
            layout: session.layout().as_str(),
            token: session.token().to_string(),
            session_id: session_id.to_string(),
            panel: "empty",
            logo_url: campaign
                .and_then(|c| c.logo_url(image_base_url))
                .unwrap_or_default(),
            disclaimer: campaign
                .and_then(|c| c.disclaimer())
                .unwrap_or_default()
                .to_string(),
            error_message: "",
            thank_you: THANK_YOU,
            reward_details: String::new(),
            contest_details: String::new(),
            fields: Vec::new(),
            submitting: false,
            toast_kind: "",
            toast_message: "",
        };

        match session.view() {
            FormView::Loading => tpl.panel = "loading",
            FormView::Error(err) => {
                tpl.panel = "error";
                tpl.error_message = err.message();
            }
            FormView::Success { reward_details } => {
                tpl.panel = "success";
                tpl.reward_details = reward_details.unwrap_or_default().to_string();
            }
            FormView::Form {
                fields, submitting, ..
            } => {
                tpl.panel = "form";
                tpl.submitting = submitting;
                tpl.contest_details = campaign
                    .and_then(|c| c.contest_details(session.opted_out()))
                    .unwrap_or_default()
                    .to_string();
                tpl.fields = fields
                    .into_iter()
                    .map(|f| FieldView::new(f, session))
                    .collect();
            }
            FormView::Empty => {}
        }

        if let Some(toast) = session.toast() {
            tpl.toast_kind = match toast.kind {
                ToastKind::Success => "success",
                ToastKind::Error => "error",
            };
            tpl.toast_message = toast.message;
        }
        tpl
    }
}

#[derive(Template)]
#[template(path = "invalid_link.html")]
pub struct InvalidLinkTemplate {
    pub page_title: &'static str,
}

impl Default for InvalidLinkTemplate {
    fn default() -> Self {
        Self {
            page_title: "Invalid Survey Link",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::{Campaign, Question, QuestionType, Reward};
    use survey_flow::{FormValues, Layout};

    fn campaign() -> Campaign {
        Campaign {
            token: "tok".into(),
            title: "Guest Feedback".into(),
            active: true,
            reward: Some(Reward {
                id: None,
                title: "Gift card".into(),
                description: String::new(),
            }),
            reward_details_text: None,
            workplace: None,
            winners_count: None,
            start_date: None,
            end_date: None,
            branding: None,
            questions: vec![Question {
                id: "7".into(),
                kind: QuestionType::Rating,
                prompt: "Rate your visit".into(),
                required: true,
                options: None,
            }],
        }
    }

    fn ready_session() -> FormSession {
        let mut session = FormSession::new("tok", Layout::Compact);
        session.begin_load().unwrap();
        session.finish_load(Ok(campaign())).unwrap();
        session
    }

    #[test]
    fn form_panel_flattens_controls_and_keeps_values() {
        let mut session = ready_session();
        let c = campaign();
        let values = FormValues::from_pairs(&c, [("question_7", "4"), ("phone", "5550100100")]);
        session.update_values(values).unwrap();

        let tpl = SurveyTemplate::for_session(&session, "sid", "");
        assert_eq!(tpl.panel, "form");
        assert_eq!(tpl.layout, "compact");
        let kinds: Vec<_> = tpl.fields.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, ["checkbox", "input", "input", "input", "rating"]);

        let phone = &tpl.fields[3];
        assert_eq!(phone.value, "(555) 010-0100");
        assert_eq!(phone.max_length, "14");

        let rating = &tpl.fields[4];
        let checked: Vec<_> = rating.options.iter().filter(|o| o.checked).map(|o| o.label.as_str()).collect();
        assert_eq!(checked, ["4 - Good"]);
    }

    fn contest_session(reward: bool, details: Option<&str>) -> FormSession {
        let mut c = campaign();
        if !reward {
            c.reward = None;
        }
        c.reward_details_text = details.map(str::to_string);
        let mut session = FormSession::new("tok", Layout::Full);
        session.begin_load().unwrap();
        session.finish_load(Ok(c)).unwrap();
        session
    }

    #[test]
    fn contest_details_shown_above_form_for_entrants() {
        let session = contest_session(true, Some("Winners drawn monthly."));
        let tpl = SurveyTemplate::for_session(&session, "sid", "");
        assert_eq!(tpl.contest_details, "Winners drawn monthly.");
        let html = tpl.render().unwrap();
        let contest = html.find("Winners drawn monthly.").expect("contest text");
        assert!(contest < html.find("<form method=\"post\"").expect("form"));
    }

    #[test]
    fn contest_details_hidden_after_opt_out() {
        let mut session = contest_session(true, Some("Winners drawn monthly."));
        session.set_opted_out(true).unwrap();
        let tpl = SurveyTemplate::for_session(&session, "sid", "");
        assert_eq!(tpl.contest_details, "");
        assert!(!tpl.render().unwrap().contains("Winners drawn monthly."));
    }

    #[test]
    fn contest_details_need_a_reward_and_text() {
        let no_reward = contest_session(false, Some("Winners drawn monthly."));
        let tpl = SurveyTemplate::for_session(&no_reward, "sid", "");
        assert_eq!(tpl.contest_details, "");
        assert!(!tpl.render().unwrap().contains("class=\"contest\""));

        let no_text = contest_session(true, None);
        assert_eq!(SurveyTemplate::for_session(&no_text, "sid", "").contest_details, "");
    }

    #[test]
    fn error_panel_carries_message() {
        let mut session = FormSession::new("tok", Layout::Full);
        session.begin_load().unwrap();
        session
            .finish_load(Err(survey_core::SurveyError::CampaignInactive))
            .unwrap();
        let tpl = SurveyTemplate::for_session(&session, "sid", "");
        assert_eq!(tpl.panel, "error");
        assert_eq!(tpl.error_message, "This Feedback Survey is Not Active");
        let html = tpl.render().unwrap();
        assert!(html.contains("This Feedback Survey is Not Active"));
    }
}
