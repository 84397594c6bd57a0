use crate::{
    analytics::{AnalyticsEventName, AnalyticsRequestFactory},
    concepts::{AnalyticsSink, ApiClient, AuthHost, Transaction},
    config::ApiRequestOptions,
    controller::{CompletionResult, PaymentFlowResult, TerminalState},
    errors::Error,
    threeds2::{
        auth_params::CompleteAuthRequest,
        challenge::{ChallengeOutcome, CompletionEvent, ProtocolErrorEvent, RuntimeErrorEvent},
        transaction::TransactionGuard,
    },
    types::{FlowOutcome, StripeIntent},
};

/// Event sink of one native challenge.
///
/// Every callback consumes the receiver, so exactly one outcome is handled per attempt,
/// and the owned transaction is closed when the callback returns or unwinds.
pub struct ChallengeStatusReceiver<'c, A, H, N, T>
where
    A: ApiClient,
    H: AuthHost,
    N: AnalyticsSink,
    T: Transaction,
{
    api: &'c A,
    host: &'c H,
    analytics: &'c N,
    analytics_factory: AnalyticsRequestFactory,
    intent: StripeIntent,
    source_id: String,
    options: ApiRequestOptions,
    transaction: TransactionGuard<T>,
}

impl<'c, A, H, N, T> ChallengeStatusReceiver<'c, A, H, N, T>
where
    A: ApiClient,
    H: AuthHost,
    N: AnalyticsSink,
    T: Transaction,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: &'c A,
        host: &'c H,
        analytics: &'c N,
        analytics_factory: AnalyticsRequestFactory,
        intent: StripeIntent,
        source_id: impl Into<String>,
        options: ApiRequestOptions,
        transaction: TransactionGuard<T>,
    ) -> Self {
        ChallengeStatusReceiver {
            api,
            host,
            analytics,
            analytics_factory,
            intent,
            source_id: source_id.into(),
            options,
            transaction,
        }
    }

    /// The transaction the challenge UI runs against.
    pub fn transaction(&self) -> &T {
        &self.transaction
    }

    /// Dispatches an outcome to the matching callback.
    pub async fn receive(self, outcome: ChallengeOutcome) -> TerminalState {
        match outcome {
            ChallengeOutcome::Completed {
                event,
                ui_type_code,
            } => self.completed(event, &ui_type_code).await,
            ChallengeOutcome::Cancelled { ui_type_code } => self.cancelled(&ui_type_code).await,
            ChallengeOutcome::TimedOut { ui_type_code } => self.timedout(&ui_type_code).await,
            ChallengeOutcome::ProtocolError(event) => self.protocol_error(event).await,
            ChallengeOutcome::RuntimeError(event) => self.runtime_error(event).await,
        }
    }

    /// The challenge finished. Success is only surfaced once the server confirmed it.
    ///
    /// The final transaction status is reported to the server; the server's
    /// confirmation alone decides the outcome.
    pub async fn completed(self, event: CompletionEvent, ui_type_code: &str) -> TerminalState {
        self.emit_challenge(AnalyticsEventName::Auth3ds2ChallengeCompleted, ui_type_code);
        let request = CompleteAuthRequest::completed(self.source_id.as_str(), &event);

        let confirmed = match self.notify_server(&request).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::CompletionNotConfirmed),
            Err(err) => Err(err),
        };
        match confirmed {
            Ok(()) => self.deliver(FlowOutcome::Succeeded, true, None),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to complete 3DS2 authentication: {err}");

                self.host.relay(PaymentFlowResult::failure(
                    self.intent.request_code(),
                    self.intent.client_secret().map(str::to_string),
                    err,
                ));
                TerminalState::Failure
            }
        }
    }

    pub async fn cancelled(self, ui_type_code: &str) -> TerminalState {
        self.emit_challenge(AnalyticsEventName::Auth3ds2ChallengeCanceled, ui_type_code);
        let server_notified = self.notify_server_best_effort().await;
        self.deliver(FlowOutcome::Canceled, server_notified, None)
    }

    pub async fn timedout(self, ui_type_code: &str) -> TerminalState {
        self.emit_challenge(AnalyticsEventName::Auth3ds2ChallengeTimedOut, ui_type_code);
        let server_notified = self.notify_server_best_effort().await;
        self.deliver(FlowOutcome::TimedOut, server_notified, None)
    }

    pub async fn protocol_error(self, event: ProtocolErrorEvent) -> TerminalState {
        let message = event.error_message;
        self.analytics
            .emit(self.analytics_factory.create_challenge_error(
                self.intent.id(),
                &message.error_code,
                &message.error_description,
                Some(&message.error_details),
                Some(&message.transaction_id),
            ));
        let server_notified = self.notify_server_best_effort().await;
        let error = Error::ChallengeFailed {
            transaction_id: Some(message.transaction_id),
            code: message.error_code,
            description: message.error_description,
            details: message.error_details,
        };
        self.deliver(FlowOutcome::Failed, server_notified, Some(error))
    }

    pub async fn runtime_error(self, event: RuntimeErrorEvent) -> TerminalState {
        self.analytics
            .emit(self.analytics_factory.create_challenge_error(
                self.intent.id(),
                &event.error_code,
                &event.error_message,
                None,
                None,
            ));
        let server_notified = self.notify_server_best_effort().await;
        let error = Error::ChallengeFailed {
            transaction_id: None,
            code: event.error_code,
            description: event.error_message,
            details: String::new(),
        };
        self.deliver(FlowOutcome::Failed, server_notified, Some(error))
    }

    fn emit_challenge(&self, name: AnalyticsEventName, ui_type_code: &str) {
        self.analytics.emit(
            self.analytics_factory
                .create_challenge(name, self.intent.id(), ui_type_code),
        );
    }

    /// Records the presentation and tells the server the challenge is over.
    async fn notify_server(&self, request: &CompleteAuthRequest) -> Result<bool, Error> {
        let initial_ui_type = self
            .transaction
            .initial_challenge_ui_type()
            .unwrap_or_default();
        self.emit_challenge(
            AnalyticsEventName::Auth3ds2ChallengePresented,
            &initial_ui_type,
        );

        self.options.validate()?;
        let notified = self
            .api
            .complete_3ds2_auth(request, &self.options)
            .await?;
        Ok(notified)
    }

    async fn notify_server_best_effort(&self) -> bool {
        let request = CompleteAuthRequest::new(self.source_id.as_str());
        match self.notify_server(&request).await {
            Ok(notified) => notified,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("3DS2 completion notification failed: {_err}");
                false
            }
        }
    }

    fn deliver(
        &self,
        outcome: FlowOutcome,
        server_notified: bool,
        error: Option<Error>,
    ) -> TerminalState {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "3DS2 challenge finished: intent='{}', outcome={:?}, server_notified={}",
            self.intent.id(),
            outcome,
            server_notified
        );

        let terminal = if outcome == FlowOutcome::Succeeded {
            TerminalState::Success
        } else {
            TerminalState::Failure
        };
        self.host.complete_challenge(CompletionResult {
            request_code: self.intent.request_code(),
            intent: self.intent.clone(),
            outcome,
            server_notified,
            error,
        });
        terminal
    }
}
