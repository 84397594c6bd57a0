use crate::threeds2::auth_result::ThreeDs2Error;

/// Error types for 3DS2 authentication and intent confirmation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing, blank or secret API key.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    /// The card network named by the server has no known directory server.
    #[error("Unsupported directory server: {0}")]
    UnsupportedDirectoryServer(String),

    /// A certificate in the 3DS2 payload could not be decoded.
    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("Unsupported 3DS2 message version: {0}")]
    UnsupportedMessageVersion(String),

    /// The 3DS2 service refused to create a transaction.
    #[error("Failed to create 3DS2 transaction: {0}")]
    TransactionCreation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote authenticate endpoint returned an error payload.
    #[error("Error encountered during 3DS2 authentication request. {0}")]
    Authentication(ThreeDs2Error),

    /// The challenge flow ended with a protocol or runtime error.
    #[error("3DS2 challenge failed: code={code}, description={description}, details={details}")]
    ChallengeFailed {
        transaction_id: Option<String>,
        code: String,
        description: String,
        details: String,
    },

    /// Native 3DS2 was requested but neither the SDK nor a redirect fallback can serve it.
    #[error("Native 3DS2 authentication is not available and no redirect URL was supplied")]
    NativeAuthUnavailable,

    #[error("Payment flow result carries neither a client secret nor an error")]
    MissingClientSecret,

    /// The server answered the challenge completion without recording it.
    #[error("3DS2 challenge completion was not confirmed by the server")]
    CompletionNotConfirmed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Whether the error was raised before any network call was made.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidApiKey(_)
                | Error::UnsupportedDirectoryServer(_)
                | Error::MalformedCertificate(_)
                | Error::UnsupportedMessageVersion(_)
        )
    }
}

/// Transport level failures, separating connectivity from API rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The API answered with a non-success status.
    #[error("API rejected request ({status}, {kind}): {message}")]
    Rejected {
        status: u16,
        kind: String,
        message: String,
        code: Option<String>,
        param: Option<String>,
    },

    /// The request could not be built from the given options.
    #[error("Invalid API request: {0}")]
    InvalidRequest(String),

    /// The API answered with a body that could not be understood.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ApiError::Connection(_))
    }
}

/// A specialized `Result` type for 3DS2 operations.
pub type Result<T> = std::result::Result<T, Error>;
