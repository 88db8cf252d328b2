//! AWS Lambda front of the lending assistant: bootstrap of the shared
//! clients, the per-turn handler, and the application summary documents.

pub mod bootstrap;
pub mod document;
pub mod handler;
pub mod logging;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use handler::{handle_event, handle_turn};
pub use logging::init_logging;
