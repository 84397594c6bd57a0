#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::json;
use threeds2_kit::{
    analytics::{AnalyticsEvent, AnalyticsEventName},
    concepts::{AnalyticsSink, ApiClient, AuthHost, ChallengeUi, ThreeDs2Service, Transaction},
    config::ApiRequestOptions,
    controller::{BrowserAuthRequest, CompletionResult, PaymentFlowResult},
    errors::ApiError,
    threeds2::{
        auth_params::{CompleteAuthRequest, Stripe3ds2AuthParams},
        auth_result::{Ares, AuthResultEnvelope},
        challenge::{ChallengeOutcome, ChallengeParameters, ChallengeTimeout},
        directory_server::DirectoryServer,
        transaction::{AuthenticationRequestParameters, CreateTransactionParams},
    },
    types::StripeIntent,
};

pub const DER_B64: &str = "MIIBCgKCAQEAu5l2";
pub const CLIENT_SECRET: &str = "pi_1ExkUeAWhjPjYwPiXph9ouXa_secret_nGTdfGlzL9Uop59wN55LraiC7";
pub const SOURCE_ID: &str = "src_1ExkUeAWhjPjYwPiLWUvXrSA";

#[derive(Debug, thiserror::Error)]
#[error("fake failure: {0}")]
pub struct FakeError(pub String);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn options() -> ApiRequestOptions {
    ApiRequestOptions::builder().api_key("pk_test_123").build()
}

pub fn intent_json(status: &str, next_action: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "pi_1ExkUeAWhjPjYwPiXph9ouXa",
        "object": "payment_intent",
        "amount": 2000,
        "currency": "usd",
        "client_secret": CLIENT_SECRET,
        "livemode": false,
        "status": status,
        "next_action": next_action,
    })
}

pub fn intent(status: &str, next_action: serde_json::Value) -> StripeIntent {
    serde_json::from_value(intent_json(status, next_action)).unwrap()
}

pub const SETUP_CLIENT_SECRET: &str =
    "seti_1EqTSZGMT9dGPIDGVzCUs6dV_secret_FL9mS9ILygVyGEOSmVNqHT83rxkqy0Y";

pub fn setup_intent(status: &str, next_action: serde_json::Value) -> StripeIntent {
    serde_json::from_value(json!({
        "id": "seti_1EqTSZGMT9dGPIDGVzCUs6dV",
        "object": "setup_intent",
        "client_secret": SETUP_CLIENT_SECRET,
        "livemode": false,
        "status": status,
        "usage": "off_session",
        "next_action": next_action,
    }))
    .unwrap()
}

pub fn use_3ds2_action(directory_server_name: &str) -> serde_json::Value {
    let directory_server_id = DirectoryServer::lookup(directory_server_name)
        .map(|ds| ds.id())
        .unwrap_or_default();
    json!({
        "type": "use_stripe_sdk",
        "use_stripe_sdk": {
            "type": "stripe_3ds2_fingerprint",
            "three_d_secure_2_source": SOURCE_ID,
            "directory_server_name": directory_server_name,
            "server_transaction_id": "e64bb72f-60ac-4845-b8b6-47cfdb0f73aa",
            "directory_server_encryption": {
                "directory_server_id": directory_server_id,
                "certificate": format!("-----BEGIN CERTIFICATE-----\n{DER_B64}\n-----END CERTIFICATE-----\n"),
                "key_id": "7c4debe3f4af7f9d1569a2ffea4343c2566826ee",
                "root_certificate_authorities": [DER_B64]
            },
            "stripe_js": "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecaz6CRMbs6FrXfuYKBRSUG/src_client_secret_F6octeOshkgxT47dr0ZxSZiv"
        }
    })
}

pub fn ares(trans_status: &str) -> Ares {
    serde_json::from_value(json!({
        "threeDSServerTransID": "e64bb72f-60ac-4845-b8b6-47cfdb0f73aa",
        "acsChallengeMandated": "Y",
        "acsSignedContent": "eyJhbGciOiJFUzI1NiJ9",
        "acsTransID": "7fb4e8a1-2b0a-4f3a-b1c1-8e1a4e9d0a55",
        "messageType": "ARes",
        "messageVersion": "2.1.0",
        "sdkTransID": "sdk_trans_1",
        "transStatus": trans_status,
    }))
    .unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Authenticate(Stripe3ds2AuthParams),
    Complete(String),
    RetrievePayment(String),
    RetrieveSetup(String),
    CancelSource { intent_id: String, source_id: String },
    Analytics(String),
}

/// Answers every call from preset results and records it.
pub struct FakeApi {
    pub calls: Mutex<Vec<ApiCall>>,
    pub authenticate: Mutex<Result<AuthResultEnvelope, ApiError>>,
    pub complete: Mutex<Result<bool, ApiError>>,
    pub retrieve: Mutex<Result<StripeIntent, ApiError>>,
    pub cancel: Mutex<Result<StripeIntent, ApiError>>,
    pub completions: Mutex<Vec<CompleteAuthRequest>>,
}

impl FakeApi {
    pub fn new(authenticate: Result<AuthResultEnvelope, ApiError>) -> Self {
        FakeApi {
            calls: Mutex::new(vec![]),
            authenticate: Mutex::new(authenticate),
            complete: Mutex::new(Ok(true)),
            retrieve: Mutex::new(Ok(intent("succeeded", serde_json::Value::Null))),
            cancel: Mutex::new(Ok(intent("requires_payment_method", serde_json::Value::Null))),
            completions: Mutex::new(vec![]),
        }
    }

    pub fn with_complete(self, complete: Result<bool, ApiError>) -> Self {
        *self.complete.lock().unwrap() = complete;
        self
    }

    pub fn with_retrieve(self, retrieve: Result<StripeIntent, ApiError>) -> Self {
        *self.retrieve.lock().unwrap() = retrieve;
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ApiClient for FakeApi {
    async fn authenticate_3ds2(
        &self,
        params: &Stripe3ds2AuthParams,
        _options: &ApiRequestOptions,
    ) -> Result<AuthResultEnvelope, ApiError> {
        self.record(ApiCall::Authenticate(params.clone()));
        self.authenticate.lock().unwrap().clone()
    }

    async fn complete_3ds2_auth(
        &self,
        request: &CompleteAuthRequest,
        _options: &ApiRequestOptions,
    ) -> Result<bool, ApiError> {
        self.record(ApiCall::Complete(request.source.clone()));
        self.completions.lock().unwrap().push(request.clone());
        self.complete.lock().unwrap().clone()
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        _options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        self.record(ApiCall::RetrievePayment(client_secret.to_string()));
        self.retrieve.lock().unwrap().clone()
    }

    async fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        _options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        self.record(ApiCall::RetrieveSetup(client_secret.to_string()));
        self.retrieve.lock().unwrap().clone()
    }

    async fn cancel_intent_source(
        &self,
        intent_id: &str,
        source_id: &str,
        _options: &ApiRequestOptions,
    ) -> Result<StripeIntent, ApiError> {
        self.record(ApiCall::CancelSource {
            intent_id: intent_id.to_string(),
            source_id: source_id.to_string(),
        });
        self.cancel.lock().unwrap().clone()
    }

    async fn log_analytics(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
        self.record(ApiCall::Analytics(event.event_name().to_string()));
        Ok(())
    }
}

pub struct FakeTransaction {
    pub initial_ui_type: Option<String>,
    pub closed: Arc<AtomicUsize>,
    pub message_version: String,
}

impl Transaction for FakeTransaction {
    fn authentication_request_parameters(&self) -> AuthenticationRequestParameters {
        AuthenticationRequestParameters {
            sdk_app_id: "1a8b7c3e-app".to_string(),
            sdk_transaction_id: "sdk_trans_1".to_string(),
            device_data: "eyJlbmMiOiJBMTI4Q0JDLUhTMjU2In0".to_string(),
            sdk_ephemeral_public_key: r#"{"kty":"EC","crv":"P-256"}"#.to_string(),
            sdk_reference_number: "3DS_LOA_SDK_STIN_12345".to_string(),
            message_version: self.message_version.clone(),
        }
    }

    fn initial_challenge_ui_type(&self) -> Option<String> {
        self.initial_ui_type.clone()
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakeTransaction {
    pub fn new(initial_ui_type: Option<&str>) -> Self {
        FakeTransaction {
            initial_ui_type: initial_ui_type.map(str::to_string),
            closed: Arc::new(AtomicUsize::new(0)),
            message_version: "2.1.0".to_string(),
        }
    }
}

pub struct FakeThreeDs2Service {
    pub created: Mutex<Vec<CreateTransactionParams>>,
    pub closed: Arc<AtomicUsize>,
    pub fail: bool,
    pub message_version: String,
}

impl FakeThreeDs2Service {
    pub fn new() -> Self {
        FakeThreeDs2Service {
            created: Mutex::new(vec![]),
            closed: Arc::new(AtomicUsize::new(0)),
            fail: false,
            message_version: "2.1.0".to_string(),
        }
    }

    /// Transactions report `version` in their request parameters.
    pub fn with_message_version(version: &str) -> Self {
        FakeThreeDs2Service {
            message_version: version.to_string(),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        FakeThreeDs2Service {
            fail: true,
            ..Self::new()
        }
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ThreeDs2Service for FakeThreeDs2Service {
    type Transaction = FakeTransaction;
    type Error = FakeError;

    fn create_transaction(
        &self,
        params: &CreateTransactionParams,
    ) -> Result<FakeTransaction, FakeError> {
        self.created.lock().unwrap().push(params.clone());
        if self.fail {
            return Err(FakeError("no transaction".to_string()));
        }
        Ok(FakeTransaction {
            initial_ui_type: Some("02".to_string()),
            closed: self.closed.clone(),
            message_version: self.message_version.clone(),
        })
    }
}

/// Resolves the challenge with a preset outcome.
pub struct FakeChallengeUi {
    pub outcome: Mutex<Option<Result<ChallengeOutcome, FakeError>>>,
    pub presented: Mutex<Vec<(ChallengeParameters, ChallengeTimeout)>>,
}

impl FakeChallengeUi {
    pub fn new(outcome: ChallengeOutcome) -> Self {
        FakeChallengeUi {
            outcome: Mutex::new(Some(Ok(outcome))),
            presented: Mutex::new(vec![]),
        }
    }

    pub fn failing() -> Self {
        FakeChallengeUi {
            outcome: Mutex::new(Some(Err(FakeError("window lost".to_string())))),
            presented: Mutex::new(vec![]),
        }
    }

    pub fn presented(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl ChallengeUi<FakeTransaction> for FakeChallengeUi {
    type Error = FakeError;

    async fn present(
        &self,
        _transaction: &FakeTransaction,
        parameters: &ChallengeParameters,
        timeout: ChallengeTimeout,
    ) -> Result<ChallengeOutcome, FakeError> {
        self.presented
            .lock()
            .unwrap()
            .push((parameters.clone(), timeout));
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(FakeError("presented twice".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub progress: Mutex<Vec<DirectoryServer>>,
    pub browser: Mutex<Vec<BrowserAuthRequest>>,
    pub relayed: Mutex<Vec<PaymentFlowResult>>,
    pub completions: Mutex<Vec<CompletionResult>>,
}

impl RecordingHost {
    pub fn take_relayed(&self) -> Vec<PaymentFlowResult> {
        std::mem::take(&mut *self.relayed.lock().unwrap())
    }

    pub fn take_completions(&self) -> Vec<CompletionResult> {
        std::mem::take(&mut *self.completions.lock().unwrap())
    }

    pub fn browser_requests(&self) -> Vec<BrowserAuthRequest> {
        self.browser.lock().unwrap().clone()
    }
}

impl AuthHost for RecordingHost {
    fn show_progress(&self, directory_server: DirectoryServer) {
        self.progress.lock().unwrap().push(directory_server);
    }

    fn start_browser_auth(&self, request: BrowserAuthRequest) {
        self.browser.lock().unwrap().push(request);
    }

    fn relay(&self, result: PaymentFlowResult) {
        self.relayed.lock().unwrap().push(result);
    }

    fn complete_challenge(&self, result: CompletionResult) {
        self.completions.lock().unwrap().push(result);
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn names(&self) -> Vec<AnalyticsEventName> {
        self.events.lock().unwrap().iter().map(|e| e.name).collect()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn emit(&self, event: AnalyticsEvent) {
        self.events.lock().unwrap().push(event);
    }
}
