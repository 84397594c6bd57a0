use std::fmt::Display;

/// Maximum duration of a challenge, in minutes.
///
/// Values outside the protocol range of 5 to 99 minutes are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeTimeout(u8);

impl ChallengeTimeout {
    pub const MIN_MINUTES: u8 = 5;
    pub const MAX_MINUTES: u8 = 99;

    pub fn new(minutes: u8) -> Self {
        ChallengeTimeout(minutes.clamp(Self::MIN_MINUTES, Self::MAX_MINUTES))
    }

    pub fn minutes(&self) -> u8 {
        self.0
    }
}

impl Default for ChallengeTimeout {
    fn default() -> Self {
        ChallengeTimeout(Self::MIN_MINUTES)
    }
}

/// Zero padded two digit minutes, the `sdkMaxTimeout` wire format.
impl Display for ChallengeTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// What the challenge UI needs from the ARes to start the challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeParameters {
    pub three_ds_server_transaction_id: Option<String>,
    pub acs_transaction_id: Option<String>,
    pub acs_signed_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub sdk_transaction_id: String,
    pub transaction_status: String,
}

/// Error message nested in a protocol error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub transaction_id: String,
    pub error_code: String,
    pub error_description: String,
    pub error_details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolErrorEvent {
    pub sdk_transaction_id: String,
    pub error_message: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeErrorEvent {
    pub error_code: String,
    pub error_message: String,
}

/// The single result of one challenge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Completed {
        event: CompletionEvent,
        ui_type_code: String,
    },
    Cancelled {
        ui_type_code: String,
    },
    TimedOut {
        ui_type_code: String,
    },
    ProtocolError(ProtocolErrorEvent),
    RuntimeError(RuntimeErrorEvent),
}

impl ChallengeOutcome {
    /// Wraps a failure of the challenge UI itself.
    pub fn from_ui_error(error: &dyn std::error::Error) -> Self {
        ChallengeOutcome::RuntimeError(RuntimeErrorEvent {
            error_code: "ChallengeUiError".to_string(),
            error_message: error.to_string(),
        })
    }
}
