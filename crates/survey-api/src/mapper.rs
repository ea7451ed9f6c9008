//! Wire question records and campaign info mapped onto the renderable model.

use survey_core::{Branding, Campaign, Question, QuestionType, Reward, Workplace};

use crate::wire::{ApiQuestion, CampaignBasicData};

/// Case-insensitive and total: unrecognized tags degrade to free text.
pub fn map_question_type(wire_type: &str) -> QuestionType {
    match wire_type.to_ascii_lowercase().as_str() {
        "rating" => QuestionType::Rating,
        "text" => QuestionType::Text,
        "multiplechoice" => QuestionType::MultipleChoice,
        "yesno" => QuestionType::YesNo,
        _ => QuestionType::Text,
    }
}

/// Sorted ascending by sort order; equal keys keep their wire order.
pub fn map_questions(mut wire: Vec<ApiQuestion>) -> Vec<Question> {
    wire.sort_by_key(|q| q.sort_order);
    wire.into_iter()
        .map(|q| Question {
            id: q.id.into_string(),
            kind: map_question_type(&q.question_type),
            prompt: q.question_text,
            required: q.required.unwrap_or(true),
            options: q.options,
        })
        .collect()
}

pub fn merge_campaign(token: &str, basic: CampaignBasicData, questions: Vec<Question>) -> Campaign {
    Campaign {
        token: token.to_string(),
        title: basic.title,
        active: basic.active,
        reward: basic.reward.map(|r| Reward {
            id: r.id,
            title: r.title,
            description: r.description,
        }),
        reward_details_text: basic.reward_details_text,
        workplace: basic.workplace.map(|w| Workplace {
            iri: w.iri,
            id: w.id,
            name: w.name,
        }),
        winners_count: basic.winners_count,
        start_date: basic.start_date,
        end_date: basic.end_date,
        branding: basic.guest_connect_setting.map(|s| Branding {
            logo_path: s.logo_path,
            disclaimer_text: s.disclaimer_text,
        }),
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireId;

    fn wire_question(id: i64, kind: &str, sort_order: i64) -> ApiQuestion {
        ApiQuestion {
            id: WireId::from(id),
            question_text: format!("Question {id}"),
            question_type: kind.to_string(),
            sort_order,
            options: None,
            required: None,
        }
    }

    #[test]
    fn known_types_map_case_insensitively() {
        assert_eq!(map_question_type("rating"), QuestionType::Rating);
        assert_eq!(map_question_type("TEXT"), QuestionType::Text);
        assert_eq!(map_question_type("MultipleChoice"), QuestionType::MultipleChoice);
        assert_eq!(map_question_type("yesNo"), QuestionType::YesNo);
    }

    #[test]
    fn unknown_types_fall_back_to_text() {
        for tag in ["slider", "", "date", "multiple_choice", "yes-no", "nps", " rating", "text "] {
            assert_eq!(map_question_type(tag), QuestionType::Text, "tag {tag:?}");
        }
    }

    #[test]
    fn output_is_sorted_by_sort_order_regardless_of_input_order() {
        let questions = map_questions(vec![
            wire_question(30, "text", 3),
            wire_question(10, "rating", 1),
            wire_question(40, "yesno", 4),
            wire_question(20, "multiplechoice", 2),
        ]);
        let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["10", "20", "30", "40"]);
        assert_eq!(questions[1].kind, QuestionType::MultipleChoice);
    }

    #[test]
    fn required_defaults_to_true_and_ids_become_strings() {
        let mut optional = wire_question(8, "text", 2);
        optional.required = Some(false);
        let mut choice = wire_question(5, "multiplechoice", 1);
        choice.options = Some(vec!["Social Media".into(), "Friend/Family".into()]);

        let questions = map_questions(vec![optional, choice]);
        assert_eq!(questions[0].id, "5");
        assert!(questions[0].required);
        assert_eq!(questions[0].options().len(), 2);
        assert!(!questions[1].required);
        assert_eq!(questions[1].numeric_id(), Ok(8));
    }

    #[test]
    fn string_ids_are_kept_verbatim() {
        let mut q = wire_question(0, "yesno", 1);
        q.id = WireId::Str("42".into());
        let questions = map_questions(vec![q]);
        assert_eq!(questions[0].id, "42");
        assert_eq!(questions[0].field_name(), "question_42");
        assert_eq!(questions[0].numeric_id(), Ok(42));
    }

    #[test]
    fn merge_carries_branding_and_workplace() {
        let basic: CampaignBasicData = serde_json::from_value(serde_json::json!({
            "title": "Guest Feedback",
            "active": true,
            "workplace": {"@id": "/api/workplaces/2", "id": 2, "name": "Harbor"},
            "guestConnectSetting": {"disclaimerText": "Terms apply.", "logoPath": "harbor.png"}
        }))
        .unwrap();
        let campaign = merge_campaign("tok-1", basic, vec![]);
        assert_eq!(campaign.token, "tok-1");
        assert_eq!(campaign.workplace_ref(), "/api/workplaces/2");
        assert_eq!(campaign.disclaimer(), Some("Terms apply."));
        assert!(!campaign.has_reward());
    }
}
