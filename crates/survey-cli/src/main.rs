use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use survey_api::HttpSurveyApi;
use survey_core::{campaign_token, classify_device, RuntimeEnvironment, StaticEnvironment};
use survey_flow::fields::{EMAIL_FIELD, NAME_FIELD, OPT_OUT_FIELD, PHONE_FIELD};
use survey_flow::{
    Control, FormSession, FormValues, FormView, SubmitOutcome, SurveyConfig, TransitionError,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "survey-cli")]
#[command(about = "Campaign survey form command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the survey form over HTTP.
    Serve,
    /// Load a campaign and print its form.
    Show {
        /// Campaign token or a `/campaign/{token}` path.
        campaign: String,
    },
    /// Submit answers from a JSON file without a browser.
    Submit {
        campaign: String,
        /// JSON object keyed by question id or `question_{id}`.
        #[arg(long)]
        answers: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, default_value_t = false)]
        opt_out: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => survey_web::serve_from_env().await?,
        Commands::Show { campaign } => {
            let config = SurveyConfig::from_env();
            let api = HttpSurveyApi::new(config.http_client_config())?;
            let session = load_session(&config, &api, &campaign).await?;
            print_session(&session)?;
        }
        Commands::Submit {
            campaign,
            answers,
            name,
            email,
            phone,
            opt_out,
        } => {
            let config = SurveyConfig::from_env();
            let raw = tokio::fs::read_to_string(&answers)
                .await
                .with_context(|| format!("failed to read {}", answers.display()))?;
            let mut pairs = answer_pairs(&raw)
                .with_context(|| format!("invalid answers file {}", answers.display()))?;
            for (field, value) in [(NAME_FIELD, name), (EMAIL_FIELD, email), (PHONE_FIELD, phone)] {
                if let Some(value) = value {
                    pairs.push((field.to_string(), value));
                }
            }
            if opt_out {
                pairs.push((OPT_OUT_FIELD.to_string(), "on".to_string()));
            }
            let id = submit(&config, &campaign, pairs).await?;
            println!("submitted: submission_id={id}");
        }
    }

    Ok(())
}

/// Accepts a bare token or any link whose path holds `/campaign/{token}`.
fn resolve_token(env: &dyn RuntimeEnvironment) -> Result<String> {
    let campaign = env.location_path();
    if let Some(token) = campaign_token(env) {
        return Ok(token);
    }
    if campaign.is_empty() || campaign.contains('/') {
        bail!("Invalid Survey Link: no campaign token in `{campaign}`");
    }
    Ok(campaign.to_string())
}

/// Flattens `{"1": "yes", "question_2": 4}` into form field pairs.
fn answer_pairs(raw: &str) -> Result<Vec<(String, String)>> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
    object
        .into_iter()
        .map(|(key, value)| {
            let field = if key.chars().all(|c| c.is_ascii_digit()) {
                format!("question_{key}")
            } else {
                key
            };
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => bail!("answer for `{field}` must be a string or number, got {other}"),
            };
            Ok((field, text))
        })
        .collect()
}

fn cli_env(config: &SurveyConfig, token: &str) -> StaticEnvironment {
    StaticEnvironment::new(config.user_agent.clone(), format!("/campaign/{token}"))
}

async fn load_session(
    config: &SurveyConfig,
    api: &HttpSurveyApi,
    campaign: &str,
) -> Result<FormSession> {
    let token = resolve_token(&StaticEnvironment::new(
        config.user_agent.clone(),
        campaign.trim(),
    ))?;
    let layout = config.layout.resolve(classify_device(&config.user_agent));
    let mut session = FormSession::new(token, layout);
    session.load(api).await?;
    Ok(session)
}

fn print_session(session: &FormSession) -> Result<()> {
    match session.view() {
        FormView::Form {
            campaign, fields, ..
        } => {
            println!("{} [{}]", campaign.title, session.layout().as_str());
            if let Some(reward) = &campaign.reward {
                println!("reward: {} ({})", reward.title, reward.description);
            }
            for field in fields {
                let marker = if field.required { "*" } else { " " };
                let detail = match field.control {
                    Control::Rating { choices } => choices
                        .iter()
                        .map(|(n, label)| format!("{n}={label}"))
                        .collect::<Vec<_>>()
                        .join(", "),
                    Control::YesNo => "yes | no".to_string(),
                    Control::Choice { options } => options.join(" | "),
                    Control::TextArea { .. } => "free text".to_string(),
                    Control::Input { input_type, .. } => input_type.to_string(),
                    Control::Checkbox { .. } => "on | off".to_string(),
                };
                println!("{marker} {:<18} {}  [{detail}]", field.name, field.label);
            }
            if let Some(disclaimer) = campaign.disclaimer() {
                println!("\n{disclaimer}");
            }
            Ok(())
        }
        FormView::Error(err) => bail!("{} ({})", err.message(), err.code()),
        FormView::Loading | FormView::Success { .. } | FormView::Empty => {
            bail!("campaign is not ready ({})", session.state().name())
        }
    }
}

async fn submit(config: &SurveyConfig, campaign: &str, pairs: Vec<(String, String)>) -> Result<i64> {
    let api = HttpSurveyApi::new(config.http_client_config())?;
    let mut session = load_session(config, &api, campaign).await?;
    if let FormView::Error(err) = session.view() {
        bail!("{} ({})", err.message(), err.code());
    }
    let env = cli_env(config, session.token());

    let values = match session.campaign() {
        Some(campaign) => FormValues::from_pairs(campaign, pairs),
        None => bail!("campaign did not load"),
    };
    session.set_opted_out(values.opted_out())?;
    session.update_values(values)?;

    match session.submit(&api, &env, config.answers_shape).await {
        Ok(SubmitOutcome::Submitted(record)) => {
            info!(submission_id = record.id, "survey submitted");
            Ok(record.id)
        }
        Ok(SubmitOutcome::Retry) => {
            bail!("{}", session.toast().map(|t| t.message).unwrap_or("submission failed"))
        }
        Ok(SubmitOutcome::Terminal(err)) => bail!("{} ({})", err.message(), err.code()),
        Err(TransitionError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("{}: {}", error.field, error.message);
            }
            bail!("{} field(s) failed validation", errors.len())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(campaign: &str) -> Result<String> {
        resolve_token(&StaticEnvironment::new("survey-cli", campaign.trim()))
    }

    #[test]
    fn tokens_come_from_bare_values_or_paths() {
        assert_eq!(resolve("abc123").unwrap(), "abc123");
        assert_eq!(
            resolve("https://survey.example.com/campaign/abc123?src=qr").unwrap(),
            "abc123"
        );
        assert!(resolve("/surveys/abc").is_err());
        assert!(resolve("  ").is_err());
    }

    #[test]
    fn answers_file_accepts_ids_and_field_names() {
        let mut pairs =
            answer_pairs(r#"{"1": "yes", "question_2": 4, "3": "Friend/Family"}"#).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("question_1".to_string(), "yes".to_string()),
                ("question_2".to_string(), "4".to_string()),
                ("question_3".to_string(), "Friend/Family".to_string()),
            ]
        );
        assert!(answer_pairs(r#"{"1": true}"#).is_err());
        assert!(answer_pairs("[]").is_err());
    }
}
