pub mod calculator;
pub mod config;
pub mod domain;
pub mod errors;
pub mod intents;
pub mod ports;
pub mod responses;
pub mod validation;

pub use domain::account::{AccountRecord, PlanKind};
pub use domain::application::{ApplicationId, LoanApplication};
pub use domain::dialog::{DialogResponse, DialogTurnRequest};
pub use errors::{DialogError, GenAiError, InterfaceError, StoreError};
pub use intents::{DialogServices, DialogSettings, IntentDispatcher, IntentKind};
pub use ports::{AccountStore, ApplicationPublisher, ApplicationStore, DocumentStore, GenAiBridge};
