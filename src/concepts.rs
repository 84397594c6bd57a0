//! Capabilities the authentication core depends on but does not implement.
//!
//! The HTTP transport, the 3DS2 cryptographic engine, the challenge UI and the host
//! screens are all platform specific. The controller only talks to them through these
//! traits, so every flow can be driven by fakes in tests.

use std::sync::Arc;

use crate::{
    analytics::AnalyticsEvent,
    config::ApiRequestOptions,
    controller::{BrowserAuthRequest, CompletionResult, PaymentFlowResult},
    ephemeral_key::EphemeralKeyError,
    errors::ApiError,
    threeds2::{
        auth_params::{CompleteAuthRequest, Stripe3ds2AuthParams},
        auth_result::AuthResultEnvelope,
        challenge::{ChallengeOutcome, ChallengeParameters, ChallengeTimeout},
        directory_server::DirectoryServer,
        transaction::{AuthenticationRequestParameters, CreateTransactionParams},
    },
    types::StripeIntent,
};

/// Remote payment API.
pub trait ApiClient {
    /// `POST 3ds2/authenticate`
    fn authenticate_3ds2(
        &self,
        params: &Stripe3ds2AuthParams,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<AuthResultEnvelope, ApiError>> + Send;

    /// `POST 3ds2/challenge_complete`; `true` once the server recorded the completion.
    fn complete_3ds2_auth(
        &self,
        request: &CompleteAuthRequest,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send;

    fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send;

    fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send;

    /// `POST payment_intents/{id}/source_cancel`
    fn cancel_intent_source(
        &self,
        intent_id: &str,
        source_id: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send;

    /// Best effort delivery of one analytics event.
    fn log_analytics(
        &self,
        event: &AnalyticsEvent,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: ApiClient + ?Sized + Sync> ApiClient for Arc<T> {
    fn authenticate_3ds2(
        &self,
        params: &Stripe3ds2AuthParams,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<AuthResultEnvelope, ApiError>> + Send {
        (**self).authenticate_3ds2(params, options)
    }

    fn complete_3ds2_auth(
        &self,
        request: &CompleteAuthRequest,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send {
        (**self).complete_3ds2_auth(request, options)
    }

    fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send {
        (**self).retrieve_payment_intent(client_secret, options)
    }

    fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send {
        (**self).retrieve_setup_intent(client_secret, options)
    }

    fn cancel_intent_source(
        &self,
        intent_id: &str,
        source_id: &str,
        options: &ApiRequestOptions,
    ) -> impl Future<Output = Result<StripeIntent, ApiError>> + Send {
        (**self).cancel_intent_source(intent_id, source_id, options)
    }

    fn log_analytics(
        &self,
        event: &AnalyticsEvent,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).log_analytics(event)
    }
}

/// A 3DS2 transaction opened by the native SDK.
pub trait Transaction {
    fn authentication_request_parameters(&self) -> AuthenticationRequestParameters;

    /// UI type of the first challenge screen, if the SDK knows it.
    fn initial_challenge_ui_type(&self) -> Option<String>;

    /// Releases the transaction. Called exactly once, by [`crate::threeds2::transaction::TransactionGuard`].
    fn close(&self);
}

/// The native 3DS2 engine.
pub trait ThreeDs2Service {
    type Transaction: Transaction;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_transaction(
        &self,
        params: &CreateTransactionParams,
    ) -> Result<Self::Transaction, Self::Error>;
}

/// The challenge screens shown by the native SDK.
///
/// `present` resolves with exactly one outcome once the cardholder finishes, cancels or
/// the timeout expires.
pub trait ChallengeUi<T: Transaction> {
    type Error: std::error::Error;

    fn present(
        &self,
        transaction: &T,
        parameters: &ChallengeParameters,
        timeout: ChallengeTimeout,
    ) -> impl Future<Output = Result<ChallengeOutcome, Self::Error>>;
}

/// The screen hosting the flow. Receives every result of the controller.
pub trait AuthHost {
    /// Shows the SDK progress screen before the authenticate call.
    fn show_progress(&self, directory_server: DirectoryServer);

    /// Continues authentication in a browser.
    fn start_browser_auth(&self, request: BrowserAuthRequest);

    /// Delivers a refreshed intent or an error.
    fn relay(&self, result: PaymentFlowResult);

    /// Delivers the end of a native challenge.
    fn complete_challenge(&self, result: CompletionResult);
}

/// Non-blocking analytics emission. Failures are never reported back.
pub trait AnalyticsSink {
    fn emit(&self, event: AnalyticsEvent);
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Arc<T> {
    fn emit(&self, event: AnalyticsEvent) {
        (**self).emit(event)
    }
}

/// Issues ephemeral keys, usually through the integrator's own backend.
pub trait EphemeralKeyProvider {
    /// Returns the raw JSON of a new key for `api_version`.
    fn create_ephemeral_key(
        &self,
        api_version: &str,
    ) -> impl Future<Output = Result<String, EphemeralKeyError>>;
}

impl<T: EphemeralKeyProvider + ?Sized> EphemeralKeyProvider for Arc<T> {
    fn create_ephemeral_key(
        &self,
        api_version: &str,
    ) -> impl Future<Output = Result<String, EphemeralKeyError>> {
        (**self).create_ephemeral_key(api_version)
    }
}
