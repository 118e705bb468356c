/// Failures that end a poll cycle before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("vendor authentication failed: {0}")]
    Auth(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
}

impl PollError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }
}

/// Process exit status for a failed command.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PollError>() {
        Some(PollError::Auth(_)) => 2,
        Some(PollError::Fetch(_)) => 3,
        None => 1,
    }
}
