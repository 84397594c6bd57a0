//! HTTP implementation of [`ApiClient`] on top of `reqwest`.

use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::{
    analytics::AnalyticsEvent,
    concepts::ApiClient,
    config::ApiRequestOptions,
    errors::ApiError,
    threeds2::{
        auth_params::{CompleteAuthRequest, Stripe3ds2AuthParams},
        auth_result::{AuthResultEnvelope, Stripe3ds2AuthResult},
    },
    types::StripeIntent,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1/";
pub const DEFAULT_ANALYTICS_BASE: &str = "https://q.stripe.com/";
pub const DEFAULT_API_VERSION: &str = "2020-03-02";

const STRIPE_VERSION: &str = "stripe-version";
const STRIPE_ACCOUNT: &str = "stripe-account";
const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Remote payment API client.
///
/// Source cancellation picks the payment or setup endpoint from the intent id prefix.
#[derive(Debug, Clone)]
pub struct StripeApiClient {
    pub api_base: Url,
    pub analytics_base: Url,
    pub api_version: String,
    pub client: reqwest::Client,
}

/// Error payload of a rejected request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    code: Option<String>,
    param: Option<String>,
}

impl StripeApiClient {
    pub fn new() -> Result<Self, url::ParseError> {
        Ok(StripeApiClient {
            api_base: Url::parse(DEFAULT_API_BASE)?,
            analytics_base: Url::parse(DEFAULT_ANALYTICS_BASE)?,
            api_version: DEFAULT_API_VERSION.to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_analytics_base(mut self, analytics_base: Url) -> Self {
        self.analytics_base = analytics_base;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.api_base
            .join(path)
            .map_err(|err| ApiError::InvalidRequest(format!("{path}: {err}")))
    }

    /// Headers common to every API call.
    pub fn request_headers(&self, options: &ApiRequestOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", options.api_key))?,
        );
        headers.insert(STRIPE_VERSION, header_value(&self.api_version)?);
        if let Some(account) = &options.stripe_account {
            headers.insert(STRIPE_ACCOUNT, header_value(account)?);
        }
        if let Some(key) = &options.idempotency_key {
            headers.insert(IDEMPOTENCY_KEY, header_value(key)?);
        }
        Ok(headers)
    }

    async fn retrieve_intent(
        &self,
        collection: &str,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        let id = intent_id_from_client_secret(client_secret)?;
        let request = self
            .client
            .get(self.endpoint(&format!("{collection}/{id}"))?)
            .headers(self.request_headers(options)?)
            .query(&[("client_secret", client_secret)]);
        execute(request).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|err| ApiError::InvalidRequest(format!("Invalid header value: {err}")))
}

/// `pi_123_secret_456` -> `pi_123`
pub fn intent_id_from_client_secret(client_secret: &str) -> Result<&str, ApiError> {
    match client_secret.split_once("_secret_") {
        Some((id, _)) if !id.is_empty() => Ok(id),
        _ => Err(ApiError::InvalidRequest(format!(
            "Malformed client secret for intent: {client_secret}"
        ))),
    }
}

fn rejection(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => ApiError::Rejected {
            status,
            kind: error.kind.unwrap_or_else(|| "api_error".to_string()),
            message: error.message.unwrap_or_default(),
            code: error.code,
            param: error.param,
        },
        Err(_) => ApiError::Rejected {
            status,
            kind: "api_error".to_string(),
            message: body.to_string(),
            code: None,
            param: None,
        },
    }
}

async fn execute<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::Connection(err.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ApiError::Connection(err.to_string()))?;

    if !status.is_success() {
        #[cfg(feature = "tracing")]
        tracing::debug!("API request rejected with status {status}");

        return Err(rejection(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

impl ApiClient for StripeApiClient {
    async fn authenticate_3ds2(
        &self,
        params: &Stripe3ds2AuthParams,
        options: &ApiRequestOptions,
    ) -> Result<AuthResultEnvelope, ApiError> {
        let form = params
            .to_params()
            .map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        let request = self
            .client
            .post(self.endpoint("3ds2/authenticate")?)
            .headers(self.request_headers(options)?)
            .form(&form);
        let result: Stripe3ds2AuthResult = execute(request).await?;
        AuthResultEnvelope::try_from(result)
    }

    async fn complete_3ds2_auth(
        &self,
        request: &CompleteAuthRequest,
        options: &ApiRequestOptions,
    ) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(self.endpoint("3ds2/challenge_complete")?)
            .headers(self.request_headers(options)?)
            .form(request)
            .send()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;
        Err(rejection(status.as_u16(), &body))
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        self.retrieve_intent("payment_intents", client_secret, options)
            .await
    }

    async fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        self.retrieve_intent("setup_intents", client_secret, options)
            .await
    }

    async fn cancel_intent_source(
        &self,
        intent_id: &str,
        source_id: &str,
        options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        let collection = if intent_id.starts_with("seti_") {
            "setup_intents"
        } else {
            "payment_intents"
        };
        let request = self
            .client
            .post(self.endpoint(&format!("{collection}/{intent_id}/source_cancel"))?)
            .headers(self.request_headers(options)?)
            .form(&[("source", source_id)]);
        execute(request).await
    }

    async fn log_analytics(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.analytics_base.clone())
            .query(&event.params)
            .send()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                kind: "api_error".to_string(),
                message: format!("Analytics request for '{}' rejected", event.event_name()),
                code: None,
                param: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_id_from_client_secret() {
        assert_eq!(
            intent_id_from_client_secret("pi_1EXm_secret_abc").unwrap(),
            "pi_1EXm"
        );
        assert_eq!(
            intent_id_from_client_secret("seti_1Ex_secret_xyz").unwrap(),
            "seti_1Ex"
        );
        assert!(intent_id_from_client_secret("pi_1EXm").is_err());
        assert!(intent_id_from_client_secret("_secret_abc").is_err());
    }

    #[test]
    fn test_request_headers() {
        let client = StripeApiClient::new().unwrap();
        let options = ApiRequestOptions::builder()
            .api_key("pk_test_123")
            .stripe_account("acct_1")
            .build();
        let headers = client.request_headers(&options).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer pk_test_123");
        assert_eq!(headers.get("stripe-version").unwrap(), DEFAULT_API_VERSION);
        assert_eq!(headers.get("stripe-account").unwrap(), "acct_1");
        assert!(headers.get("idempotency-key").is_none());
    }

    #[test]
    fn test_rejection_parses_error_body() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "No such payment_intent", "param": "intent"}}"#;
        assert_eq!(
            rejection(404, body),
            ApiError::Rejected {
                status: 404,
                kind: "invalid_request_error".to_string(),
                message: "No such payment_intent".to_string(),
                code: None,
                param: Some("intent".to_string()),
            }
        );

        match rejection(502, "Bad Gateway") {
            ApiError::Rejected { kind, message, .. } => {
                assert_eq!(kind, "api_error");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
