use std::time::Duration;

use survey_api::{AnswersShape, HttpClientConfig};
use survey_core::DeviceClass;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Compact,
    Full,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Compact => "compact",
            Layout::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutPreference {
    /// Compact on phones, full everywhere else.
    #[default]
    Auto,
    Fixed(Layout),
}

impl LayoutPreference {
    pub fn resolve(&self, device: DeviceClass) -> Layout {
        match self {
            LayoutPreference::Fixed(layout) => *layout,
            LayoutPreference::Auto if device == DeviceClass::Mobile => Layout::Compact,
            LayoutPreference::Auto => Layout::Full,
        }
    }
}

impl std::str::FromStr for LayoutPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(LayoutPreference::Auto),
            "compact" | "mobile" => Ok(LayoutPreference::Fixed(Layout::Compact)),
            "full" => Ok(LayoutPreference::Fixed(Layout::Full)),
            other => Err(format!("unknown layout `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub api_base_url: String,
    pub image_base_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub web_port: u16,
    pub layout: LayoutPreference,
    pub answers_shape: AnswersShape,
}

impl SurveyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_base_url: var("SURVEY_API_BASE_URL")
                .unwrap_or_else(|| "https://guestconnect.stage.byod.ai/api".to_string()),
            image_base_url: var("SURVEY_IMAGE_URL").unwrap_or_default(),
            http_timeout_secs: var("SURVEY_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            user_agent: var("SURVEY_USER_AGENT").unwrap_or_else(|| "survey-form/0.1".to_string()),
            web_port: var("SURVEY_WEB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            layout: parse_or_default("SURVEY_LAYOUT", var("SURVEY_LAYOUT")),
            answers_shape: parse_or_default("SURVEY_ANSWERS_SHAPE", var("SURVEY_ANSWERS_SHAPE")),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    match raw.map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            warn!(key, %err, "ignoring invalid setting");
            T::default()
        }
        None => T::default(),
    }
}
