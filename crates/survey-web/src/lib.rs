//! Axum + Askama front end for campaign survey forms.

pub mod views;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Path as AxumPath, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use survey_api::{HttpSurveyApi, SurveyApi};
use survey_core::{campaign_token, classify_device, StaticEnvironment};
use survey_flow::{FormSession, FormState, FormValues, SurveyConfig, TransitionError};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::views::{InvalidLinkTemplate, SurveyTemplate};

pub const CRATE_NAME: &str = "survey-web";

pub const SESSION_FIELD: &str = "session";
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(60 * 60);

pub type SharedSession = Arc<Mutex<FormSession>>;

struct SessionEntry {
    token: String,
    session: SharedSession,
    last_seen: Instant,
}

/// Live form sessions keyed by the id embedded in each rendered form.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl SessionRegistry {
    pub async fn insert(&self, session: FormSession) -> (Uuid, SharedSession) {
        let mut entries = self.entries.lock().await;
        prune(&mut entries, SESSION_IDLE_LIMIT);
        let id = Uuid::new_v4();
        let token = session.token().to_string();
        let shared = Arc::new(Mutex::new(session));
        entries.insert(
            id,
            SessionEntry {
                token,
                session: shared.clone(),
                last_seen: Instant::now(),
            },
        );
        (id, shared)
    }

    /// A session only answers for the token it was opened with.
    pub async fn get(&self, id: &Uuid, token: &str) -> Option<SharedSession> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(id).filter(|e| e.token == token)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        prune(&mut entries, max_idle)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn prune(entries: &mut HashMap<Uuid, SessionEntry>, max_idle: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.last_seen.elapsed() < max_idle);
    let removed = before - entries.len();
    if removed > 0 {
        debug!(removed, "pruned idle survey sessions");
    }
    removed
}

pub struct AppState {
    pub api: Arc<dyn SurveyApi>,
    pub config: SurveyConfig,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(api: Arc<dyn SurveyApi>, config: SurveyConfig) -> Self {
        Self {
            api,
            config,
            sessions: SessionRegistry::default(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    router(Arc::new(state))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(invalid_link_handler))
        .route("/healthz", get(healthz_handler))
        .route("/campaign/{token}", get(campaign_handler).post(submit_handler))
        .route("/campaign/{token}/toast/dismiss", post(dismiss_toast_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = SurveyConfig::from_env();
    let api = HttpSurveyApi::new(config.http_client_config())?;
    let port = config.web_port;
    let state = AppState::new(Arc::new(api), config);
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(port, "survey form listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn invalid_link_handler() -> Response {
    render_html(InvalidLinkTemplate::default())
}

/// Paths under `/campaign/{token}/...` go back to the form; anything else is an invalid link.
async fn fallback_handler(headers: HeaderMap, uri: Uri) -> Response {
    match campaign_token(&request_env(&headers, &uri)) {
        Some(token) => Redirect::to(&format!("/campaign/{token}")).into_response(),
        None => (StatusCode::NOT_FOUND, render_html(InvalidLinkTemplate::default())).into_response(),
    }
}

async fn campaign_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(token): AxumPath<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let env = request_env(&headers, &uri);
    let (id, shared) = open_session(&state, &token, &env).await;
    let session = shared.lock().await;
    render_session(&state, &id, &session)
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(token): AxumPath<String>,
    headers: HeaderMap,
    uri: Uri,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let env = request_env(&headers, &uri);
    let (id, shared) = match find_session(&state, &token, &pairs).await {
        Some(found) => found,
        None => {
            debug!(%token, "unknown session on submit; reloading campaign");
            open_session(&state, &token, &env).await
        }
    };

    let Ok(mut session) = shared.try_lock() else {
        return conflict();
    };

    let values = session.campaign().map(|campaign| {
        FormValues::from_pairs(
            campaign,
            pairs.into_iter().filter(|(key, _)| key != SESSION_FIELD),
        )
    });
    if let (FormState::Ready, Some(values)) = (session.state(), values) {
        let applied = session
            .set_opted_out(values.opted_out())
            .and_then(|()| session.update_values(values));
        if let Err(err) = applied {
            warn!(%token, error = %err, "could not apply submitted values");
        } else {
            match session
                .submit(state.api.as_ref(), &env, state.config.answers_shape)
                .await
            {
                Ok(outcome) => debug!(%token, ?outcome, "submit finished"),
                Err(TransitionError::Invalid(errors)) => {
                    debug!(%token, errors = errors.len(), "submit blocked by validation")
                }
                Err(TransitionError::InFlight) => return conflict(),
                Err(err) => warn!(%token, error = %err, "submit refused"),
            }
        }
    }

    render_session(&state, &id, &session)
}

async fn dismiss_toast_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(token): AxumPath<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let Some((id, shared)) = find_session(&state, &token, &pairs).await else {
        return Redirect::to(&format!("/campaign/{token}")).into_response();
    };
    let Ok(mut session) = shared.try_lock() else {
        return conflict();
    };
    session.dismiss_toast();
    render_session(&state, &id, &session)
}

async fn find_session(
    state: &AppState,
    token: &str,
    pairs: &[(String, String)],
) -> Option<(Uuid, SharedSession)> {
    let id = pairs
        .iter()
        .find(|(key, _)| key == SESSION_FIELD)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())?;
    let shared = state.sessions.get(&id, token).await?;
    Some((id, shared))
}

async fn open_session(
    state: &AppState,
    token: &str,
    env: &StaticEnvironment,
) -> (Uuid, SharedSession) {
    let layout = state
        .config
        .layout
        .resolve(classify_device(&env.user_agent));
    let mut session = FormSession::new(token, layout);
    if let Err(err) = session.load(state.api.as_ref()).await {
        warn!(token, error = %err, "fresh session refused to load");
    }
    state.sessions.insert(session).await
}

fn request_env(headers: &HeaderMap, uri: &Uri) -> StaticEnvironment {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    StaticEnvironment::new(user_agent, uri.path())
}

fn render_session(state: &AppState, id: &Uuid, session: &FormSession) -> Response {
    render_html(SurveyTemplate::for_session(
        session,
        &id.to_string(),
        &state.config.image_base_url,
    ))
}

fn conflict() -> Response {
    (
        StatusCode::CONFLICT,
        Html("A submission is already in progress for this survey.".to_string()),
    )
        .into_response()
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
