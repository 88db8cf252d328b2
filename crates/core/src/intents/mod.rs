//! Intent routing and the per-intent dialog handlers.
//!
//! Each handler reads the turn, validates the slots it owns, and answers with
//! exactly one dialog action. Names the bot does not model explicitly go to
//! the GenAI fallback.

pub mod flow;
mod genai;
mod loan_application;
mod loan_calculator;
mod verify_identity;

use std::sync::Arc;

use tracing::{info, Instrument};

use crate::domain::dialog::{DialogResponse, DialogTurnRequest};
use crate::errors::DialogError;
use crate::ports::{AccountStore, ApplicationPublisher, ApplicationStore, GenAiBridge};

pub use loan_application::APPLICATION_ID_ATTRIBUTE;
pub use loan_calculator::LOAN_ESTIMATE_ATTRIBUTE;
pub use verify_identity::{account_summary, PIN_SLOT, USER_NAME_SLOT};

pub const DEFAULT_COMPANY_NAME: &str = "Octank Financial";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentKind {
    VerifyIdentity,
    LoanApplication,
    LoanCalculator,
    GenAi,
}

impl IntentKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "VerifyIdentity" => Self::VerifyIdentity,
            "LoanApplication" => Self::LoanApplication,
            "LoanCalculator" => Self::LoanCalculator,
            _ => Self::GenAi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifyIdentity => "verify_identity",
            Self::LoanApplication => "loan_application",
            Self::LoanCalculator => "loan_calculator",
            Self::GenAi => "genai",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogSettings {
    pub company_name: String,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self { company_name: DEFAULT_COMPANY_NAME.to_string() }
    }
}

/// Collaborators shared by every turn. Built once at bootstrap.
#[derive(Clone)]
pub struct DialogServices {
    pub accounts: Arc<dyn AccountStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub publisher: Option<Arc<dyn ApplicationPublisher>>,
    pub genai: Arc<dyn GenAiBridge>,
    pub settings: DialogSettings,
}

#[derive(Clone)]
pub struct IntentDispatcher {
    services: DialogServices,
}

impl IntentDispatcher {
    pub fn new(services: DialogServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &DialogServices {
        &self.services
    }

    /// Runs one dialog turn. Slots and session attributes of `request` are
    /// updated in place while the handler validates them.
    pub async fn dispatch(
        &self,
        request: &mut DialogTurnRequest,
    ) -> Result<DialogResponse, DialogError> {
        let kind = IntentKind::from_name(request.intent_name());
        let span = tracing::info_span!(
            "dialog_turn",
            intent_name = %request.intent_name(),
            session_id = request.session_id.as_deref().unwrap_or("unknown"),
        );

        async {
            info!(event_name = "dialog.turn.dispatch", handler = kind.as_str(), "dispatching dialog turn");
            let response = match kind {
                IntentKind::VerifyIdentity => verify_identity::handle(&self.services, request).await,
                IntentKind::LoanApplication => loan_application::handle(&self.services, request).await,
                IntentKind::LoanCalculator => loan_calculator::handle(&self.services, request).await,
                IntentKind::GenAi => genai::handle(&self.services, request).await,
            }?;
            info!(
                event_name = "dialog.turn.completed",
                dialog_action = response.action().type_name(),
                "dialog turn completed"
            );
            Ok::<_, DialogError>(response)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::IntentKind;

    #[test]
    fn only_three_names_escape_the_fallback() {
        assert_eq!(IntentKind::from_name("VerifyIdentity"), IntentKind::VerifyIdentity);
        assert_eq!(IntentKind::from_name("LoanApplication"), IntentKind::LoanApplication);
        assert_eq!(IntentKind::from_name("LoanCalculator"), IntentKind::LoanCalculator);
        for name in ["FallbackIntent", "verifyidentity", "", "MakePayment"] {
            assert_eq!(IntentKind::from_name(name), IntentKind::GenAi, "{name}");
        }
    }
}
