use std::fmt::Display;

pub type Record<V> = std::collections::HashMap<String, V>;

pub type AnyJson = serde_json::Value;

/// Distinguishes payment confirmation from setup confirmation when a flow is handed to the host.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RequestCode {
    Payment,
    Setup,
}

impl RequestCode {
    pub const PAYMENT: i32 = 50000;
    pub const SETUP: i32 = 50001;

    pub fn code(&self) -> i32 {
        match self {
            RequestCode::Payment => Self::PAYMENT,
            RequestCode::Setup => Self::SETUP,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::PAYMENT => Some(RequestCode::Payment),
            Self::SETUP => Some(RequestCode::Setup),
            _ => None,
        }
    }
}

impl Display for RequestCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Caller-visible outcome of an authentication flow.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum FlowOutcome {
    #[default]
    Unknown,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

impl FlowOutcome {
    pub fn code(&self) -> i32 {
        match self {
            FlowOutcome::Unknown => 0,
            FlowOutcome::Succeeded => 1,
            FlowOutcome::Failed => 2,
            FlowOutcome::Canceled => 3,
            FlowOutcome::TimedOut => 4,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => FlowOutcome::Succeeded,
            2 => FlowOutcome::Failed,
            3 => FlowOutcome::Canceled,
            4 => FlowOutcome::TimedOut,
            _ => FlowOutcome::Unknown,
        }
    }
}
