use serde::{Deserialize, Deserializer};
use url::Url;

use crate::types::{AnyJson, Record, RequestCode};

/// Either kind of intent the confirmation API returns.
///
/// Intents are never mutated. Every remote call yields a freshly parsed successor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "object")]
pub enum StripeIntent {
    #[serde(rename = "payment_intent")]
    PaymentIntent(PaymentIntent),
    #[serde(rename = "setup_intent")]
    SetupIntent(SetupIntent),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub livemode: bool,
    pub status: Option<IntentStatus>,
    #[serde(default)]
    pub next_action: NextActionData,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    /// Source attached to the intent, used when the flow asks to cancel it.
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub livemode: bool,
    pub status: Option<IntentStatus>,
    #[serde(default)]
    pub next_action: NextActionData,
    pub usage: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    /// Legacy spelling of `requires_action` on older API versions.
    RequiresSourceAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl StripeIntent {
    pub fn id(&self) -> &str {
        match self {
            StripeIntent::PaymentIntent(pi) => &pi.id,
            StripeIntent::SetupIntent(si) => &si.id,
        }
    }

    pub fn client_secret(&self) -> Option<&str> {
        match self {
            StripeIntent::PaymentIntent(pi) => pi.client_secret.as_deref(),
            StripeIntent::SetupIntent(si) => si.client_secret.as_deref(),
        }
    }

    pub fn is_live_mode(&self) -> bool {
        match self {
            StripeIntent::PaymentIntent(pi) => pi.livemode,
            StripeIntent::SetupIntent(si) => si.livemode,
        }
    }

    pub fn status(&self) -> Option<IntentStatus> {
        match self {
            StripeIntent::PaymentIntent(pi) => pi.status,
            StripeIntent::SetupIntent(si) => si.status,
        }
    }

    pub fn next_action(&self) -> &NextActionData {
        match self {
            StripeIntent::PaymentIntent(pi) => &pi.next_action,
            StripeIntent::SetupIntent(si) => &si.next_action,
        }
    }

    pub fn requires_action(&self) -> bool {
        matches!(
            self.status(),
            Some(IntentStatus::RequiresAction | IntentStatus::RequiresSourceAction)
        )
    }

    /// The request code the host uses to route the flow result back.
    pub fn request_code(&self) -> RequestCode {
        match self {
            StripeIntent::PaymentIntent(_) => RequestCode::Payment,
            StripeIntent::SetupIntent(_) => RequestCode::Setup,
        }
    }
}

/// What the client must do before the intent can proceed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NextActionData {
    /// Send the customer to `url` in a browser.
    RedirectToUrl(RedirectToUrl),
    /// Authenticate natively with the 3DS2 SDK.
    Use3ds2(Use3ds2Data),
    /// 3DS1 authentication served through a browser.
    Use3ds1 { url: Url },
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectToUrl {
    pub url: Url,
    pub return_url: Option<Url>,
}

/// Server-supplied 3DS2 payload of a `stripe_3ds2_fingerprint` action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Use3ds2Data {
    #[serde(rename = "three_d_secure_2_source")]
    pub source: String,
    #[serde(rename = "directory_server_name")]
    pub server_name: String,
    #[serde(rename = "server_transaction_id")]
    pub transaction_id: String,
    #[serde(rename = "directory_server_encryption")]
    pub server_encryption: DirectoryServerEncryption,
    /// Everything else the server sent alongside, e.g. `three_ds_method_url`.
    #[serde(flatten)]
    pub sdk_specific_fields: Record<AnyJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryServerEncryption {
    pub directory_server_id: String,
    /// PEM or base64 encoded directory server certificate.
    #[serde(rename = "certificate")]
    pub ds_certificate: String,
    pub key_id: Option<String>,
    #[serde(default)]
    pub root_certificate_authorities: Vec<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawNextAction {
    RedirectToUrl {
        redirect_to_url: RedirectToUrl,
    },
    UseStripeSdk {
        use_stripe_sdk: RawSdkAction,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawSdkAction {
    #[serde(rename = "stripe_3ds2_fingerprint")]
    Fingerprint(Use3ds2Data),
    #[serde(rename = "three_d_secure_redirect")]
    ThreeDs1Redirect { stripe_js: Url },
    #[serde(other)]
    Other,
}

impl From<RawNextAction> for NextActionData {
    fn from(raw: RawNextAction) -> Self {
        match raw {
            RawNextAction::RedirectToUrl { redirect_to_url } => {
                NextActionData::RedirectToUrl(redirect_to_url)
            }
            RawNextAction::UseStripeSdk { use_stripe_sdk } => match use_stripe_sdk {
                RawSdkAction::Fingerprint(data) => NextActionData::Use3ds2(data),
                RawSdkAction::ThreeDs1Redirect { stripe_js } => {
                    NextActionData::Use3ds1 { url: stripe_js }
                }
                RawSdkAction::Other => NextActionData::None,
            },
            RawNextAction::Other => NextActionData::None,
        }
    }
}

impl<'de> Deserialize<'de> for NextActionData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawNextAction>::deserialize(deserializer)?;
        Ok(raw.map(NextActionData::from).unwrap_or_default())
    }
}
