use thiserror::Error;

/// Failure talking to one of the external stores (accounts, applications,
/// object storage).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("record decode failure: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenAiError {
    #[error("llm invocation failed: {0}")]
    Invocation(String),
    #[error("agent run failed: {0}")]
    Agent(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    GenAi(#[from] GenAiError),
    #[error("malformed dialog request: {0}")]
    MalformedRequest(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "Sorry, I could not understand that request. Please try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Our systems are temporarily unavailable. Please try again in a few minutes."
            }
            Self::Internal { .. } => "Something went wrong on our side. Please try again later.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl DialogError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<DialogError> for InterfaceError {
    fn from(value: DialogError) -> Self {
        match value {
            DialogError::MalformedRequest(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            DialogError::Store(StoreError::Unavailable(message))
            | DialogError::Store(StoreError::Backend(message)) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            DialogError::GenAi(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            DialogError::Store(StoreError::Decode(message)) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
