//! Campaign loading, two-phase submission, and the per-session form state machine.

pub mod config;
pub mod fields;
pub mod loader;
pub mod session;
pub mod submit;

pub use config::{Layout, LayoutPreference, SurveyConfig};
pub use fields::{form_fields, validate, Control, FieldError, FormField, FormValues};
pub use loader::{classify_failure, load_campaign, FailureKind};
pub use session::{FormSession, FormState, FormView, SubmitOutcome, Toast, ToastKind, TransitionError};
pub use submit::{SubmissionOrchestrator, SubmitFailure};

pub const CRATE_NAME: &str = "survey-flow";
