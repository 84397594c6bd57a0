use bon::Builder;
use url::Url;

use crate::{
    errors::{Error, Result},
    threeds2::challenge::ChallengeTimeout,
};

/// Publishable credentials of the integrating application.
///
/// Constructed once by the caller and passed down; nothing in the crate keeps a global copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfiguration {
    publishable_key: String,
    stripe_account: Option<String>,
}

impl PaymentConfiguration {
    pub fn new(publishable_key: impl Into<String>) -> Result<Self> {
        let publishable_key = publishable_key.into();
        validate_api_key(&publishable_key)?;
        Ok(PaymentConfiguration {
            publishable_key,
            stripe_account: None,
        })
    }

    pub fn with_stripe_account(mut self, account: impl Into<String>) -> Self {
        self.stripe_account = Some(account.into());
        self
    }

    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }

    pub fn stripe_account(&self) -> Option<&str> {
        self.stripe_account.as_deref()
    }

    pub fn request_options(&self) -> ApiRequestOptions {
        ApiRequestOptions {
            api_key: self.publishable_key.clone(),
            stripe_account: self.stripe_account.clone(),
            idempotency_key: None,
        }
    }
}

/// Per-request credentials.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct ApiRequestOptions {
    #[builder(into)]
    pub api_key: String,
    #[builder(into)]
    pub stripe_account: Option<String>,
    #[builder(into)]
    pub idempotency_key: Option<String>,
}

impl ApiRequestOptions {
    /// Rejects options that must never reach the network.
    pub fn validate(&self) -> Result<()> {
        validate_api_key(&self.api_key)
    }
}

fn validate_api_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidApiKey(
            "No API key provided. Set a publishable key before making requests.".to_string(),
        ));
    }
    if key.starts_with("sk_") {
        return Err(Error::InvalidApiKey(
            "Invalid Publishable Key: You are using a secret key instead of a publishable one."
                .to_string(),
        ));
    }
    Ok(())
}

/// Native 3DS2 settings.
#[derive(Builder, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreeDs2Config {
    /// Longest time the challenge UI may stay open.
    #[builder(default)]
    pub timeout: ChallengeTimeout,
}

/// Behavior of the payment controller.
///
/// The defaults enable native 3DS2, use a five minute challenge timeout, and send no
/// fallback return URL.
#[derive(Builder, Debug, Clone)]
pub struct ControllerConfig {
    /// Whether this runtime can run the native 3DS2 SDK.
    #[builder(default = true)]
    pub enable_native_3ds2: bool,

    #[builder(default)]
    pub three_ds2: ThreeDs2Config,

    /// Return URL handed to browser redirects started by this controller.
    pub return_url: Option<Url>,

    /// Prefix of every analytics event name.
    #[builder(into, default = "stripe_android".to_string())]
    pub analytics_prefix: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::builder().build()
    }
}
