use std::fmt::Display;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{errors::ApiError, threeds2::challenge::ChallengeParameters};

/// Transaction status of an ARes that requires a challenge.
pub const TRANS_STATUS_CHALLENGE: &str = "C";

/// The three shapes the authenticate endpoint answers with for one server transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResultEnvelope {
    /// An authentication response, either frictionless or asking for a challenge.
    Authentication(Ares),
    /// The issuer only supports 3DS1; continue in a browser.
    Fallback { redirect_url: Url },
    Error(ThreeDs2Error),
}

/// Raw body of the authenticate response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stripe3ds2AuthResult {
    pub id: Option<String>,
    pub ares: Option<Ares>,
    pub created: Option<i64>,
    pub source: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub livemode: bool,
    pub error: Option<ThreeDs2Error>,
    pub fallback_redirect_url: Option<Url>,
}

impl TryFrom<Stripe3ds2AuthResult> for AuthResultEnvelope {
    type Error = ApiError;

    /// A fallback URL wins over any other populated shape.
    fn try_from(result: Stripe3ds2AuthResult) -> Result<Self, ApiError> {
        if let Some(redirect_url) = result.fallback_redirect_url {
            return Ok(AuthResultEnvelope::Fallback { redirect_url });
        }
        match (result.error, result.ares) {
            (Some(error), _) => Ok(AuthResultEnvelope::Error(error)),
            (None, Some(ares)) => Ok(AuthResultEnvelope::Authentication(ares)),
            (None, None) => Err(ApiError::InvalidResponse(
                "3DS2 authentication result has no ares, error or fallback_redirect_url"
                    .to_string(),
            )),
        }
    }
}

/// EMVCo authentication response message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ares {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_trans_id: Option<String>,
    #[serde(rename = "acsChallengeMandated")]
    pub acs_challenge_mandated: Option<String>,
    #[serde(rename = "acsSignedContent")]
    pub acs_signed_content: Option<String>,
    #[serde(rename = "acsTransID")]
    pub acs_trans_id: Option<String>,
    #[serde(rename = "acsURL")]
    pub acs_url: Option<String>,
    #[serde(rename = "authenticationType")]
    pub authentication_type: Option<String>,
    #[serde(rename = "cardholderInfo")]
    pub cardholder_info: Option<String>,
    #[serde(rename = "messageType")]
    pub message_type: Option<String>,
    #[serde(rename = "messageVersion")]
    pub message_version: Option<String>,
    #[serde(rename = "sdkTransID")]
    pub sdk_trans_id: Option<String>,
    #[serde(rename = "transStatus")]
    pub trans_status: Option<String>,
}

impl Ares {
    pub fn is_challenge(&self) -> bool {
        self.trans_status.as_deref() == Some(TRANS_STATUS_CHALLENGE)
    }

    pub fn challenge_parameters(&self) -> ChallengeParameters {
        ChallengeParameters {
            three_ds_server_transaction_id: self.three_ds_server_trans_id.clone(),
            acs_transaction_id: self.acs_trans_id.clone(),
            acs_signed_content: self.acs_signed_content.clone(),
        }
    }
}

/// Error payload of the authenticate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDs2Error {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_trans_id: Option<String>,
    #[serde(rename = "acsTransID")]
    pub acs_trans_id: Option<String>,
    #[serde(rename = "dsTransID")]
    pub ds_trans_id: Option<String>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "errorComponent")]
    pub error_component: Option<String>,
    #[serde(rename = "errorDescription")]
    pub error_description: Option<String>,
    #[serde(rename = "errorDetail")]
    pub error_detail: Option<String>,
    #[serde(rename = "errorMessageType")]
    pub error_message_type: Option<String>,
    #[serde(rename = "messageType")]
    pub message_type: Option<String>,
    #[serde(rename = "messageVersion")]
    pub message_version: Option<String>,
    #[serde(rename = "sdkTransID")]
    pub sdk_trans_id: Option<String>,
}

impl Display for ThreeDs2Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn field(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }
        write!(
            f,
            "Code: {}, Detail: {}, Description: {}, Component: {}",
            field(&self.error_code),
            field(&self.error_detail),
            field(&self.error_description),
            field(&self.error_component)
        )
    }
}
