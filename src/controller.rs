//! Next-action dispatch for payment and setup intents.

use bon::Builder;
use url::Url;

use crate::{
    analytics::{AnalyticsEventName, AnalyticsRequestFactory},
    concepts::{AnalyticsSink, ApiClient, AuthHost, ChallengeUi, ThreeDs2Service, Transaction},
    config::{ApiRequestOptions, ControllerConfig},
    errors::{Error, Result},
    threeds2::{
        auth_params::Stripe3ds2AuthParams,
        auth_result::AuthResultEnvelope,
        challenge::ChallengeOutcome,
        fingerprint::AuthenticationFingerprint,
        message_version::MessageVersionRegistry,
        receiver::ChallengeStatusReceiver,
        transaction::{CreateTransactionParams, TransactionGuard},
    },
    types::{FlowOutcome, IntentStatus, NextActionData, RequestCode, StripeIntent, Use3ds2Data},
};

/// Key of the 3DS1 redirect URL that may accompany a 3DS2 payload.
const SDK_FIELD_STRIPE_JS: &str = "stripe_js";

/// Progress of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Dispatching,
    NativeChallengeInFlight,
    BrowserRedirectInFlight,
    Completing,
    Terminal(TerminalState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Success,
    Failure,
}

impl AuthState {
    pub fn can_transition_to(&self, next: AuthState) -> bool {
        use AuthState::*;
        matches!(
            (self, next),
            (Idle, Dispatching)
                | (Idle, Terminal(_))
                | (Dispatching, NativeChallengeInFlight)
                | (Dispatching, BrowserRedirectInFlight)
                | (Dispatching, Completing)
                | (Dispatching, Terminal(_))
                | (NativeChallengeInFlight, Terminal(_))
                | (Completing, Terminal(_))
        )
    }
}

/// State of a single `handle_next_action` call. Never shared between attempts.
#[derive(Debug)]
struct Attempt {
    intent_id: String,
    state: AuthState,
}

impl Attempt {
    fn new(intent_id: &str) -> Self {
        Attempt {
            intent_id: intent_id.to_string(),
            state: AuthState::Idle,
        }
    }

    fn advance(&mut self, next: AuthState) -> AuthState {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition for '{}': {:?} -> {:?}",
            self.intent_id,
            self.state,
            next
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Authentication attempt for '{}': {:?} -> {:?}",
            self.intent_id,
            self.state,
            next
        );

        self.state = next;
        next
    }
}

/// Browser based authentication handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserAuthRequest {
    pub request_code: RequestCode,
    pub client_secret: Option<String>,
    pub auth_url: Url,
    pub return_url: Option<Url>,
}

/// Result the host routes back into [`PaymentController::handle_payment_result`] or
/// [`PaymentController::handle_setup_result`].
#[derive(Debug)]
pub struct PaymentFlowResult {
    pub request_code: RequestCode,
    pub client_secret: Option<String>,
    pub outcome: FlowOutcome,
    /// A failure carried to the caller instead of an intent.
    pub error: Option<Error>,
    /// Cancel the intent's source if it still requires action on return.
    pub should_cancel_source: bool,
    pub source_id: Option<String>,
}

impl PaymentFlowResult {
    pub fn success(intent: &StripeIntent) -> Self {
        PaymentFlowResult {
            request_code: intent.request_code(),
            client_secret: intent.client_secret().map(str::to_string),
            outcome: FlowOutcome::Unknown,
            error: None,
            should_cancel_source: false,
            source_id: None,
        }
    }

    pub fn failure(
        request_code: RequestCode,
        client_secret: Option<String>,
        error: impl Into<Error>,
    ) -> Self {
        PaymentFlowResult {
            request_code,
            client_secret,
            outcome: FlowOutcome::Failed,
            error: Some(error.into()),
            should_cancel_source: false,
            source_id: None,
        }
    }

    /// Result of a browser redirect that came back to the app.
    ///
    /// `outcome_code` is the status code extracted from the return deep link.
    pub fn from_redirect(
        request_code: RequestCode,
        client_secret: impl Into<String>,
        outcome_code: i32,
        source_id: Option<String>,
    ) -> Self {
        let outcome = FlowOutcome::from_code(outcome_code);
        PaymentFlowResult {
            request_code,
            client_secret: Some(client_secret.into()),
            outcome,
            error: None,
            should_cancel_source: source_id.is_some() && outcome == FlowOutcome::Canceled,
            source_id,
        }
    }
}

/// End of a native challenge, delivered to the host.
///
/// `server_notified` reports whether the completion call succeeded; `outcome` is what the
/// caller sees. A cancelled challenge has both `server_notified` and a canceled outcome.
#[derive(Debug)]
pub struct CompletionResult {
    pub request_code: RequestCode,
    pub intent: StripeIntent,
    pub outcome: FlowOutcome,
    pub server_notified: bool,
    pub error: Option<Error>,
}

impl CompletionResult {
    pub fn into_flow_result(self) -> PaymentFlowResult {
        PaymentFlowResult {
            request_code: self.request_code,
            client_secret: self.intent.client_secret().map(str::to_string),
            outcome: self.outcome,
            error: self.error,
            should_cancel_source: false,
            source_id: None,
        }
    }
}

/// A refreshed intent and the outcome of the flow that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StripeIntentResult {
    pub intent: StripeIntent,
    pub outcome: FlowOutcome,
}

pub type PaymentIntentResult = StripeIntentResult;
pub type SetupIntentResult = StripeIntentResult;

impl StripeIntentResult {
    /// An unknown flow outcome is resolved from the intent status.
    pub fn new(intent: StripeIntent, outcome: FlowOutcome) -> Self {
        let outcome = match outcome {
            FlowOutcome::Unknown => match intent.status() {
                Some(
                    IntentStatus::Succeeded
                    | IntentStatus::RequiresCapture
                    | IntentStatus::Processing,
                ) => FlowOutcome::Succeeded,
                Some(IntentStatus::Canceled) => FlowOutcome::Canceled,
                Some(IntentStatus::RequiresPaymentMethod) => FlowOutcome::Failed,
                _ => FlowOutcome::Unknown,
            },
            outcome => outcome,
        };
        StripeIntentResult { intent, outcome }
    }
}

/// Drives intents that need additional customer action to a single outcome.
#[derive(Builder)]
pub struct PaymentController<A, S, U, N>
where
    A: ApiClient,
    S: ThreeDs2Service,
    U: ChallengeUi<S::Transaction>,
    N: AnalyticsSink,
{
    /// Remote payment API.
    pub api: A,
    /// Native 3DS2 engine.
    pub three_ds2_service: S,
    /// Native challenge screens.
    pub challenge_ui: U,
    /// Fire-and-forget analytics.
    pub analytics: N,
    #[builder(default)]
    pub config: ControllerConfig,
    #[builder(default)]
    pub message_versions: MessageVersionRegistry,
}

impl<A, S, U, N> PaymentController<A, S, U, N>
where
    A: ApiClient,
    S: ThreeDs2Service,
    U: ChallengeUi<S::Transaction>,
    N: AnalyticsSink,
{
    fn analytics_factory(&self) -> AnalyticsRequestFactory {
        AnalyticsRequestFactory::new(self.config.analytics_prefix.as_str())
    }

    /// Performs the intent's next action.
    ///
    /// Results reach the caller through `host`. The returned state is where this attempt
    /// stopped: terminal, or handed to a browser.
    pub async fn handle_next_action<H: AuthHost>(
        &self,
        host: &H,
        intent: StripeIntent,
        options: &ApiRequestOptions,
    ) -> AuthState {
        let mut attempt = Attempt::new(intent.id());

        if !intent.requires_action() || matches!(intent.next_action(), NextActionData::None) {
            host.relay(PaymentFlowResult::success(&intent));
            return attempt.advance(AuthState::Terminal(TerminalState::Success));
        }

        attempt.advance(AuthState::Dispatching);
        match intent.next_action().clone() {
            NextActionData::Use3ds2(data) if self.config.enable_native_3ds2 => {
                self.begin_3ds2_auth(host, &mut attempt, intent, &data, options)
                    .await
            }
            NextActionData::Use3ds2(data) => {
                match data
                    .sdk_specific_fields
                    .get(SDK_FIELD_STRIPE_JS)
                    .and_then(|v| v.as_str())
                    .and_then(|s| Url::parse(s).ok())
                {
                    Some(auth_url) => {
                        let return_url = self.config.return_url.clone();
                        self.begin_browser_auth(host, &mut attempt, &intent, auth_url, return_url)
                    }
                    None => self.fail(host, &mut attempt, &intent, Error::NativeAuthUnavailable),
                }
            }
            NextActionData::Use3ds1 { url } => {
                let return_url = self.config.return_url.clone();
                self.begin_browser_auth(host, &mut attempt, &intent, url, return_url)
            }
            NextActionData::RedirectToUrl(redirect) => {
                self.analytics.emit(
                    self.analytics_factory()
                        .create(AnalyticsEventName::AuthRedirect, intent.id()),
                );
                self.begin_browser_auth(
                    host,
                    &mut attempt,
                    &intent,
                    redirect.url,
                    redirect.return_url,
                )
            }
            NextActionData::None => {
                host.relay(PaymentFlowResult::success(&intent));
                attempt.advance(AuthState::Terminal(TerminalState::Success))
            }
        }
    }

    async fn begin_3ds2_auth<H: AuthHost>(
        &self,
        host: &H,
        attempt: &mut Attempt,
        intent: StripeIntent,
        data: &Use3ds2Data,
        options: &ApiRequestOptions,
    ) -> AuthState {
        if let Err(err) = options.validate() {
            return self.fail(host, attempt, &intent, err);
        }

        let fingerprint = match AuthenticationFingerprint::derive(data, &self.message_versions) {
            Ok(f) => f,
            Err(err) => return self.fail(host, attempt, &intent, err),
        };

        let transaction = match self
            .three_ds2_service
            .create_transaction(&CreateTransactionParams::new(
                &fingerprint,
                intent.is_live_mode(),
            )) {
            Ok(t) => TransactionGuard::new(t),
            Err(err) => {
                return self.fail(host, attempt, &intent, Error::TransactionCreation(Box::new(err)));
            }
        };

        let areq = transaction.authentication_request_parameters();
        if let Err(err) = self.message_versions.ensure_supported(&areq.message_version) {
            return self.fail(host, attempt, &intent, err);
        }

        let factory = self.analytics_factory();
        self.analytics.emit(factory.create_fingerprint(
            intent.id(),
            fingerprint.directory_server.name(),
            &fingerprint.message_version,
        ));
        host.show_progress(fingerprint.directory_server);

        let timeout = self.config.three_ds2.timeout;
        let auth_params = Stripe3ds2AuthParams::from_request_parameters(
            fingerprint.source.as_str(),
            areq,
            timeout,
            self.config.return_url.clone(),
        );

        let envelope = match self.api.authenticate_3ds2(&auth_params, options).await {
            Ok(envelope) => envelope,
            Err(err) => return self.fail(host, attempt, &intent, err),
        };

        match envelope {
            AuthResultEnvelope::Fallback { redirect_url } => {
                drop(transaction);
                self.analytics
                    .emit(factory.create(AnalyticsEventName::Auth3ds2Fallback, intent.id()));
                let return_url = self.config.return_url.clone();
                self.begin_browser_auth(host, attempt, &intent, redirect_url, return_url)
            }
            AuthResultEnvelope::Authentication(ares) if ares.is_challenge() => {
                attempt.advance(AuthState::NativeChallengeInFlight);
                let parameters = ares.challenge_parameters();
                let receiver = ChallengeStatusReceiver::new(
                    &self.api,
                    host,
                    &self.analytics,
                    factory,
                    intent,
                    fingerprint.source,
                    options.clone(),
                    transaction,
                );
                let outcome = self
                    .challenge_ui
                    .present(receiver.transaction(), &parameters, timeout)
                    .await
                    .unwrap_or_else(|err| ChallengeOutcome::from_ui_error(&err));
                let terminal = receiver.receive(outcome).await;
                attempt.advance(AuthState::Terminal(terminal))
            }
            AuthResultEnvelope::Authentication(_) => {
                drop(transaction);
                self.analytics.emit(
                    factory.create(AnalyticsEventName::Auth3ds2FrictionlessFlow, intent.id()),
                );
                attempt.advance(AuthState::Completing);
                match self.retrieve_intent(&intent, options).await {
                    Ok(refreshed) => {
                        host.relay(PaymentFlowResult::success(&refreshed));
                        attempt.advance(AuthState::Terminal(TerminalState::Success))
                    }
                    Err(err) => self.fail(host, attempt, &intent, err),
                }
            }
            AuthResultEnvelope::Error(error) => {
                drop(transaction);
                self.fail(host, attempt, &intent, Error::Authentication(error))
            }
        }
    }

    fn begin_browser_auth<H: AuthHost>(
        &self,
        host: &H,
        attempt: &mut Attempt,
        intent: &StripeIntent,
        auth_url: Url,
        return_url: Option<Url>,
    ) -> AuthState {
        host.start_browser_auth(BrowserAuthRequest {
            request_code: intent.request_code(),
            client_secret: intent.client_secret().map(str::to_string),
            auth_url,
            return_url,
        });
        attempt.advance(AuthState::BrowserRedirectInFlight)
    }

    fn fail<H: AuthHost>(
        &self,
        host: &H,
        attempt: &mut Attempt,
        intent: &StripeIntent,
        error: impl Into<Error>,
    ) -> AuthState {
        let error = error.into();

        #[cfg(feature = "tracing")]
        tracing::warn!("Authentication of '{}' failed: {error}", intent.id());

        host.relay(PaymentFlowResult::failure(
            intent.request_code(),
            intent.client_secret().map(str::to_string),
            error,
        ));
        attempt.advance(AuthState::Terminal(TerminalState::Failure))
    }

    async fn retrieve_intent(
        &self,
        intent: &StripeIntent,
        options: &ApiRequestOptions,
    ) -> Result<StripeIntent> {
        let client_secret = intent.client_secret().ok_or(Error::MissingClientSecret)?;
        let refreshed = match intent.request_code() {
            RequestCode::Payment => {
                self.api
                    .retrieve_payment_intent(client_secret, options)
                    .await?
            }
            RequestCode::Setup => self.api.retrieve_setup_intent(client_secret, options).await?,
        };
        Ok(refreshed)
    }

    /// Whether `result` belongs to a payment confirmation.
    pub fn should_handle_payment_result(
        &self,
        request_code: i32,
        result: Option<&PaymentFlowResult>,
    ) -> bool {
        RequestCode::from_code(request_code) == Some(RequestCode::Payment)
            && result.is_some_and(|r| r.request_code == RequestCode::Payment)
    }

    /// Whether `result` belongs to a setup confirmation.
    pub fn should_handle_setup_result(
        &self,
        request_code: i32,
        result: Option<&PaymentFlowResult>,
    ) -> bool {
        RequestCode::from_code(request_code) == Some(RequestCode::Setup)
            && result.is_some_and(|r| r.request_code == RequestCode::Setup)
    }

    /// Turns a flow result into the refreshed payment intent.
    pub async fn handle_payment_result(
        &self,
        result: PaymentFlowResult,
        options: &ApiRequestOptions,
    ) -> Result<PaymentIntentResult> {
        self.handle_result(result, options, RequestCode::Payment)
            .await
    }

    /// Turns a flow result into the refreshed setup intent.
    pub async fn handle_setup_result(
        &self,
        result: PaymentFlowResult,
        options: &ApiRequestOptions,
    ) -> Result<SetupIntentResult> {
        self.handle_result(result, options, RequestCode::Setup).await
    }

    async fn handle_result(
        &self,
        result: PaymentFlowResult,
        options: &ApiRequestOptions,
        kind: RequestCode,
    ) -> Result<StripeIntentResult> {
        if let Some(error) = result.error {
            return Err(error);
        }
        let client_secret = result.client_secret.ok_or(Error::MissingClientSecret)?;
        options.validate()?;

        let intent = match kind {
            RequestCode::Payment => {
                self.api
                    .retrieve_payment_intent(&client_secret, options)
                    .await?
            }
            RequestCode::Setup => {
                self.api
                    .retrieve_setup_intent(&client_secret, options)
                    .await?
            }
        };

        let intent = match result.source_id {
            Some(source_id) if result.should_cancel_source && intent.requires_action() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Canceling source '{source_id}' of '{}'", intent.id());

                self.api
                    .cancel_intent_source(intent.id(), &source_id, options)
                    .await?
            }
            _ => intent,
        };

        Ok(StripeIntentResult::new(intent, result.outcome))
    }
}
