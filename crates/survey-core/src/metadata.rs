//! Submission metadata capture and the runtime environment it reads from.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::{DeviceClass, SubmissionMetadata};

/// What the hosting page would otherwise read from global state.
pub trait RuntimeEnvironment: Send + Sync {
    fn user_agent(&self) -> &str;
    fn now(&self) -> DateTime<Utc>;
    fn location_path(&self) -> &str;
}

/// Environment assembled from a request (or the CLI) with an optional pinned clock.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub user_agent: String,
    pub location_path: String,
    pub fixed_now: Option<DateTime<Utc>>,
}

impl StaticEnvironment {
    pub fn new(user_agent: impl Into<String>, location_path: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            location_path: location_path.into(),
            fixed_now: None,
        }
    }

    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }
}

impl RuntimeEnvironment for StaticEnvironment {
    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    fn location_path(&self) -> &str {
        &self.location_path
    }
}

static TABLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("tablet regex"));

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Mobile|Android|iP(hone|od)|IEMobile|BlackBerry|Kindle|Silk-Accelerated|(hpw|web)OS|Opera M(obi|ini)",
    )
    .expect("mobile regex")
});

pub fn classify_browser(user_agent: &str) -> &'static str {
    const RULES: &[(&[&str], &str)] = &[
        (&["Firefox"], "Firefox"),
        (&["SamsungBrowser"], "Samsung Internet"),
        (&["Opera", "OPR"], "Opera"),
        (&["Trident"], "Internet Explorer"),
        (&["Edge"], "Edge"),
        (&["Chrome"], "Chrome"),
        (&["Safari"], "Safari"),
    ];

    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| user_agent.contains(n)))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

pub fn classify_device(user_agent: &str) -> DeviceClass {
    let lower = user_agent.to_ascii_lowercase();
    // Android without "mobi" anywhere after it is a tablet.
    let android_tablet = lower
        .match_indices("android")
        .any(|(idx, _)| !lower[idx..].contains("mobi"));

    if TABLET_RE.is_match(user_agent) || android_tablet {
        DeviceClass::Tablet
    } else if MOBILE_RE.is_match(user_agent) {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

/// Takes a fresh snapshot; callers must not reuse it across submit attempts.
pub fn capture_metadata(env: &dyn RuntimeEnvironment) -> SubmissionMetadata {
    let user_agent = env.user_agent();
    SubmissionMetadata {
        timestamp: env.now().to_rfc3339_opts(SecondsFormat::Millis, true),
        browser: classify_browser(user_agent).to_string(),
        device: classify_device(user_agent),
        user_agent: user_agent.to_string(),
    }
}

/// Campaign token from a `/campaign/{token}` path.
pub fn extract_token(path: &str) -> Option<String> {
    let (_, rest) = path.split_once("/campaign/")?;
    let token = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Campaign token for the page the environment is showing.
pub fn campaign_token(env: &dyn RuntimeEnvironment) -> Option<String> {
    extract_token(env.location_path())
}
