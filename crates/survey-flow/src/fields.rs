//! Renderable form fields, submitted values, and client-side validation.

use std::collections::BTreeMap;

use serde::Serialize;
use survey_core::validate::{is_valid_email, is_valid_phone};
use survey_core::{AnswerValue, Campaign, ContactInfo, Question, QuestionType, RATING_SCALE};

pub const NAME_FIELD: &str = "name";
pub const EMAIL_FIELD: &str = "email";
pub const PHONE_FIELD: &str = "phone";
pub const OPT_OUT_FIELD: &str = "optOutOfContest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Control {
    Rating { choices: Vec<(i64, &'static str)> },
    YesNo,
    Choice { options: Vec<String> },
    TextArea { rows: u8, placeholder: &'static str },
    Input {
        input_type: &'static str,
        placeholder: &'static str,
        max_length: Option<u32>,
    },
    Checkbox { label: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub control: Control,
}

pub fn question_field(question: &Question) -> FormField {
    let control = match question.kind {
        QuestionType::Rating => Control::Rating {
            choices: RATING_SCALE.to_vec(),
        },
        QuestionType::YesNo => Control::YesNo,
        QuestionType::MultipleChoice => Control::Choice {
            options: question.options().to_vec(),
        },
        QuestionType::Text => Control::TextArea {
            rows: 3,
            placeholder: "Enter your response",
        },
    };
    FormField {
        name: question.field_name(),
        label: question.prompt.clone(),
        required: question.required,
        control,
    }
}

/// Contact section: the opt-out box, then the inputs unless opted out.
pub fn contact_fields(opted_out: bool) -> Vec<FormField> {
    let mut fields = vec![FormField {
        name: OPT_OUT_FIELD.to_string(),
        label: "Do not enter contest".to_string(),
        required: false,
        control: Control::Checkbox {
            label: "Do not enter contest",
        },
    }];
    if opted_out {
        return fields;
    }
    fields.push(FormField {
        name: NAME_FIELD.to_string(),
        label: "Name".to_string(),
        required: true,
        control: Control::Input {
            input_type: "text",
            placeholder: "Enter your full name",
            max_length: None,
        },
    });
    fields.push(FormField {
        name: EMAIL_FIELD.to_string(),
        label: "Email".to_string(),
        required: true,
        control: Control::Input {
            input_type: "email",
            placeholder: "Enter your email",
            max_length: None,
        },
    });
    fields.push(FormField {
        name: PHONE_FIELD.to_string(),
        label: "Phone Number".to_string(),
        required: true,
        control: Control::Input {
            input_type: "tel",
            placeholder: "(123) 456-7890",
            max_length: Some(14),
        },
    });
    fields
}

/// Every field shown for a campaign, contact section first when it has a reward.
pub fn form_fields(campaign: &Campaign, opted_out: bool) -> Vec<FormField> {
    let mut fields = if campaign.has_reward() {
        contact_fields(opted_out)
    } else {
        Vec::new()
    };
    fields.extend(campaign.questions.iter().map(question_field));
    fields
}

/// Values keyed by field name (`question_{id}`, `name`, `email`, `phone`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormValues {
    values: BTreeMap<String, AnswerValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerces raw text into the type each question expects.
    pub fn from_pairs<I, K, V>(campaign: &Campaign, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = Self::new();
        for (key, raw) in pairs {
            let key = key.into();
            let raw = raw.into();
            let is_rating = campaign
                .questions
                .iter()
                .any(|q| q.kind == QuestionType::Rating && q.field_name() == key);
            let value = match raw.trim().parse::<i64>() {
                Ok(n) if is_rating => AnswerValue::Number(n),
                _ => AnswerValue::Text(raw),
            };
            values.insert(key, value);
        }
        values
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AnswerValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(AnswerValue::as_text).unwrap_or_default()
    }

    /// Value for a question, with blank text treated as unanswered.
    pub fn answer_for(&self, question: &Question) -> Option<AnswerValue> {
        self.get(&question.field_name())
            .filter(|v| !v.is_blank())
            .cloned()
    }

    pub fn opted_out(&self) -> bool {
        matches!(
            self.text(OPT_OUT_FIELD).trim().to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        )
    }

    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            name: self.text(NAME_FIELD).trim().to_string(),
            email: self.text(EMAIL_FIELD).trim().to_string(),
            phone: self.text(PHONE_FIELD).trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: impl Into<String>, message: &'static str) -> Self {
        Self {
            field: field.into(),
            message,
        }
    }
}

fn question_message(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::Rating => "Please provide a rating",
        QuestionType::YesNo | QuestionType::MultipleChoice => "Please select an option",
        QuestionType::Text => "Please provide an answer",
    }
}

fn satisfies_contract(question: &Question, value: &AnswerValue) -> bool {
    match (question.kind, value) {
        (QuestionType::Rating, AnswerValue::Number(n)) => RATING_SCALE.iter().any(|(v, _)| v == n),
        (QuestionType::Rating, AnswerValue::Text(_)) => false,
        (QuestionType::YesNo, AnswerValue::Text(s)) => s == "yes" || s == "no",
        (QuestionType::MultipleChoice, AnswerValue::Text(s)) => question.options().contains(s),
        (QuestionType::YesNo | QuestionType::MultipleChoice, AnswerValue::Number(_)) => false,
        (QuestionType::Text, _) => true,
    }
}

/// Errors in field display order; empty means the form may be submitted.
pub fn validate(campaign: &Campaign, values: &FormValues, opted_out: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if campaign.reward_participation(opted_out) {
        let contact = values.contact();
        if contact.name.is_empty() {
            errors.push(FieldError::new(NAME_FIELD, "Please enter your name"));
        }
        if contact.email.is_empty() {
            errors.push(FieldError::new(EMAIL_FIELD, "Please enter your email"));
        } else if !is_valid_email(&contact.email) {
            errors.push(FieldError::new(EMAIL_FIELD, "Please enter a valid email address"));
        }
        if contact.phone.is_empty() {
            errors.push(FieldError::new(PHONE_FIELD, "Please enter your phone number"));
        } else if !is_valid_phone(&contact.phone) {
            errors.push(FieldError::new(PHONE_FIELD, "Please enter a valid phone number"));
        }
    }

    for question in &campaign.questions {
        let ok = match values.answer_for(question) {
            Some(value) => satisfies_contract(question, &value),
            None => !question.required,
        };
        if !ok {
            errors.push(FieldError::new(question.field_name(), question_message(question.kind)));
        }
    }

    errors
}
