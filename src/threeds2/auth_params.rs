use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    threeds2::{
        challenge::{ChallengeTimeout, CompletionEvent},
        transaction::AuthenticationRequestParameters,
    },
    types::AnyJson,
};

/// Native UI interface, as defined by EMVCo.
pub const SDK_INTERFACE_NATIVE: &str = "03";

/// UI types this SDK can render, in the order they are advertised.
pub const SDK_UI_TYPES: [&str; 5] = ["01", "02", "03", "04", "05"];

/// Parameters of the remote 3DS2 authenticate call.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct Stripe3ds2AuthParams {
    #[builder(into)]
    pub source_id: String,
    #[builder(into)]
    pub sdk_app_id: String,
    #[builder(into)]
    pub sdk_reference_number: String,
    #[builder(into)]
    pub sdk_transaction_id: String,
    #[builder(into)]
    pub device_data: String,
    #[builder(into)]
    pub sdk_ephemeral_public_key: String,
    #[builder(into)]
    pub message_version: String,
    pub max_timeout: ChallengeTimeout,
    pub return_url: Option<Url>,
}

impl Stripe3ds2AuthParams {
    pub fn from_request_parameters(
        source_id: impl Into<String>,
        areq: AuthenticationRequestParameters,
        max_timeout: ChallengeTimeout,
        return_url: Option<Url>,
    ) -> Self {
        Stripe3ds2AuthParams {
            source_id: source_id.into(),
            sdk_app_id: areq.sdk_app_id,
            sdk_reference_number: areq.sdk_reference_number,
            sdk_transaction_id: areq.sdk_transaction_id,
            device_data: areq.device_data,
            sdk_ephemeral_public_key: areq.sdk_ephemeral_public_key,
            message_version: areq.message_version,
            max_timeout,
            return_url,
        }
    }

    /// Builds the form parameters, with `app` as a JSON encoded object.
    pub fn to_params(&self) -> Result<AuthenticateRequest, serde_json::Error> {
        // The key is a JWK; keep it structured when it parses, verbatim otherwise.
        let sdk_ephem_pub_key = serde_json::from_str::<AnyJson>(&self.sdk_ephemeral_public_key)
            .unwrap_or_else(|_| AnyJson::String(self.sdk_ephemeral_public_key.clone()));

        let app = AppParams {
            sdk_app_id: self.sdk_app_id.clone(),
            sdk_trans_id: self.sdk_transaction_id.clone(),
            sdk_enc_data: self.device_data.clone(),
            sdk_ephem_pub_key,
            sdk_max_timeout: self.max_timeout.to_string(),
            sdk_reference_number: self.sdk_reference_number.clone(),
            message_version: self.message_version.clone(),
            device_render_options: DeviceRenderOptions::default(),
        };

        Ok(AuthenticateRequest {
            source: self.source_id.clone(),
            app: serde_json::to_string(&app)?,
            fallback_redirect_url: self.return_url.as_ref().map(Url::to_string),
        })
    }
}

/// Form body of `POST 3ds2/authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub source: String,
    pub app: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_redirect_url: Option<String>,
}

/// Form body of `POST 3ds2/challenge_complete`.
///
/// Only a completed challenge reports its SDK transaction and final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteAuthRequest {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
}

impl CompleteAuthRequest {
    pub fn new(source: impl Into<String>) -> Self {
        CompleteAuthRequest {
            source: source.into(),
            sdk_transaction_id: None,
            transaction_status: None,
        }
    }

    pub fn completed(source: impl Into<String>, event: &CompletionEvent) -> Self {
        CompleteAuthRequest {
            sdk_transaction_id: Some(event.sdk_transaction_id.clone()),
            transaction_status: Some(event.transaction_status.clone()),
            ..Self::new(source)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppParams {
    #[serde(rename = "sdkAppID")]
    pub sdk_app_id: String,
    #[serde(rename = "sdkTransID")]
    pub sdk_trans_id: String,
    #[serde(rename = "sdkEncData")]
    pub sdk_enc_data: String,
    #[serde(rename = "sdkEphemPubKey")]
    pub sdk_ephem_pub_key: AnyJson,
    #[serde(rename = "sdkMaxTimeout")]
    pub sdk_max_timeout: String,
    #[serde(rename = "sdkReferenceNumber")]
    pub sdk_reference_number: String,
    #[serde(rename = "messageVersion")]
    pub message_version: String,
    #[serde(rename = "deviceRenderOptions")]
    pub device_render_options: DeviceRenderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRenderOptions {
    #[serde(rename = "sdkInterface")]
    pub sdk_interface: String,
    #[serde(rename = "sdkUiType")]
    pub sdk_ui_type: Vec<String>,
}

impl Default for DeviceRenderOptions {
    fn default() -> Self {
        DeviceRenderOptions {
            sdk_interface: SDK_INTERFACE_NATIVE.to_string(),
            sdk_ui_type: SDK_UI_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const EPHEMERAL_KEY: &str = r#"{"kty":"EC","crv":"P-256","x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU","y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"}"#;

    fn params(return_url: Option<Url>) -> Stripe3ds2AuthParams {
        Stripe3ds2AuthParams::builder()
            .source_id("src_123")
            .sdk_app_id("1.0.0")
            .sdk_reference_number("3DS_LOA_SDK_STIN_12345")
            .sdk_transaction_id("8dd3413f-0b45-4234-bd4a-cf9e4fb3c43a")
            .device_data("eyJlbmMiOiJBMTI4Q0JDLUhTMjU2IiwiYWxnIjoiUlNBLU9BRVAtMjU2In0")
            .sdk_ephemeral_public_key(EPHEMERAL_KEY)
            .message_version("2.1.0")
            .max_timeout(ChallengeTimeout::new(5))
            .maybe_return_url(return_url)
            .build()
    }

    #[test]
    fn test_app_params_carry_every_field() {
        let request = params(None).to_params().unwrap();
        assert_eq!(request.source, "src_123");
        assert_eq!(request.fallback_redirect_url, None);

        let app: AnyJson = serde_json::from_str(&request.app).unwrap();
        assert_eq!(
            app,
            json!({
                "sdkAppID": "1.0.0",
                "sdkTransID": "8dd3413f-0b45-4234-bd4a-cf9e4fb3c43a",
                "sdkEncData": "eyJlbmMiOiJBMTI4Q0JDLUhTMjU2IiwiYWxnIjoiUlNBLU9BRVAtMjU2In0",
                "sdkEphemPubKey": serde_json::from_str::<AnyJson>(EPHEMERAL_KEY).unwrap(),
                "sdkMaxTimeout": "05",
                "sdkReferenceNumber": "3DS_LOA_SDK_STIN_12345",
                "messageVersion": "2.1.0",
                "deviceRenderOptions": {
                    "sdkInterface": "03",
                    "sdkUiType": ["01", "02", "03", "04", "05"]
                }
            })
        );
    }

    #[test]
    fn test_fallback_redirect_url_is_serialized_when_present() {
        let url = Url::parse("stripesdk://payment_return_url/com.example.app").unwrap();
        let request = params(Some(url)).to_params().unwrap();
        let form = serde_json::to_value(&request).unwrap();
        assert_eq!(
            form["fallback_redirect_url"],
            json!("stripesdk://payment_return_url/com.example.app")
        );
        assert!(form.get("app").is_some_and(AnyJson::is_string));
    }

    #[test]
    fn test_non_json_ephemeral_key_is_sent_as_string() {
        let mut p = params(None);
        p.sdk_ephemeral_public_key = "opaque-key".to_string();
        p.max_timeout = ChallengeTimeout::new(12);
        let app: AppParams = serde_json::from_str(&p.to_params().unwrap().app).unwrap();
        assert_eq!(app.sdk_ephem_pub_key, json!("opaque-key"));
        assert_eq!(app.sdk_max_timeout, "12");
    }

    #[test]
    fn test_complete_request_reports_status_only_when_completed() {
        let plain = serde_json::to_value(CompleteAuthRequest::new("src_123")).unwrap();
        assert_eq!(plain, json!({ "source": "src_123" }));

        let event = CompletionEvent {
            sdk_transaction_id: "sdk_trans_1".to_string(),
            transaction_status: "Y".to_string(),
        };
        let completed = serde_json::to_value(CompleteAuthRequest::completed("src_123", &event)).unwrap();
        assert_eq!(
            completed,
            json!({
                "source": "src_123",
                "sdk_transaction_id": "sdk_trans_1",
                "transaction_status": "Y"
            })
        );
    }
}
