//! Fire-and-forget analytics for the authentication flows.

use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use tokio::sync::mpsc;

use crate::concepts::{AnalyticsSink, ApiClient};

pub const PARAM_EVENT: &str = "event";
pub const PARAM_INTENT_ID: &str = "intent_id";
pub const PARAM_DIRECTORY_SERVER: &str = "directory_server";
pub const PARAM_MESSAGE_VERSION: &str = "message_version";
pub const PARAM_UI_TYPE: &str = "3ds2_ui_type";
pub const PARAM_ERROR_CODE: &str = "error_code";
pub const PARAM_ERROR_MESSAGE: &str = "error_message";
pub const PARAM_ERROR_DETAILS: &str = "error_details";
pub const PARAM_TRANSACTION_ID: &str = "transaction_id";

/// Default queue size of [`ChannelAnalytics`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsEventName {
    Auth3ds2Fingerprint,
    Auth3ds2Fallback,
    Auth3ds2FrictionlessFlow,
    Auth3ds2ChallengePresented,
    Auth3ds2ChallengeCompleted,
    Auth3ds2ChallengeCanceled,
    Auth3ds2ChallengeTimedOut,
    Auth3ds2ChallengeErrored,
    AuthRedirect,
}

impl AnalyticsEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsEventName::Auth3ds2Fingerprint => "3ds2_fingerprint",
            AnalyticsEventName::Auth3ds2Fallback => "3ds2_fallback",
            AnalyticsEventName::Auth3ds2FrictionlessFlow => "3ds2_frictionless_flow",
            AnalyticsEventName::Auth3ds2ChallengePresented => "3ds2_challenge_flow_presented",
            AnalyticsEventName::Auth3ds2ChallengeCompleted => "3ds2_challenge_flow_completed",
            AnalyticsEventName::Auth3ds2ChallengeCanceled => "3ds2_challenge_flow_canceled",
            AnalyticsEventName::Auth3ds2ChallengeTimedOut => "3ds2_challenge_flow_timed_out",
            AnalyticsEventName::Auth3ds2ChallengeErrored => "3ds2_challenge_flow_errored",
            AnalyticsEventName::AuthRedirect => "url_redirect_next_action",
        }
    }
}

impl Display for AnalyticsEventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Analytics name of a challenge UI type code.
pub fn ui_type_name(code: &str) -> &'static str {
    match code {
        "01" => "text",
        "02" => "single_select",
        "03" => "multi_select",
        "04" => "oob",
        "05" => "html",
        _ => "none",
    }
}

/// One analytics record. `params` always holds the full prefixed event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub name: AnalyticsEventName,
    pub params: BTreeMap<String, String>,
}

impl AnalyticsEvent {
    pub fn event_name(&self) -> &str {
        self.params
            .get(PARAM_EVENT)
            .map(String::as_str)
            .unwrap_or_else(|| self.name.as_str())
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Builds analytics events with a shared name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsRequestFactory {
    prefix: String,
}

impl AnalyticsRequestFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        AnalyticsRequestFactory {
            prefix: prefix.into(),
        }
    }

    pub fn create(&self, name: AnalyticsEventName, intent_id: &str) -> AnalyticsEvent {
        let mut params = BTreeMap::new();
        params.insert(PARAM_EVENT.to_string(), format!("{}.{}", self.prefix, name));
        params.insert(PARAM_INTENT_ID.to_string(), intent_id.to_string());
        AnalyticsEvent { name, params }
    }

    pub fn create_fingerprint(
        &self,
        intent_id: &str,
        directory_server: &str,
        message_version: &str,
    ) -> AnalyticsEvent {
        self.create(AnalyticsEventName::Auth3ds2Fingerprint, intent_id)
            .with(PARAM_DIRECTORY_SERVER, directory_server)
            .with(PARAM_MESSAGE_VERSION, message_version)
    }

    pub fn create_challenge(
        &self,
        name: AnalyticsEventName,
        intent_id: &str,
        ui_type_code: &str,
    ) -> AnalyticsEvent {
        self.create(name, intent_id)
            .with(PARAM_UI_TYPE, ui_type_name(ui_type_code))
    }

    /// Protocol errors also carry their details and transaction id; runtime errors do not.
    pub fn create_challenge_error(
        &self,
        intent_id: &str,
        error_code: &str,
        error_message: &str,
        error_details: Option<&str>,
        transaction_id: Option<&str>,
    ) -> AnalyticsEvent {
        let mut event = self
            .create(AnalyticsEventName::Auth3ds2ChallengeErrored, intent_id)
            .with(PARAM_ERROR_CODE, error_code)
            .with(PARAM_ERROR_MESSAGE, error_message);
        if let Some(details) = error_details {
            event = event.with(PARAM_ERROR_DETAILS, details);
        }
        if let Some(transaction_id) = transaction_id {
            event = event.with(PARAM_TRANSACTION_ID, transaction_id);
        }
        event
    }
}

impl AnalyticsEvent {
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Analytics sink backed by a bounded queue and a background sender.
///
/// `emit` never blocks: when the queue is full or the worker is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelAnalytics {
    sender: mpsc::Sender<AnalyticsEvent>,
}

/// Drains a [`ChannelAnalytics`] queue into an [`ApiClient`].
pub struct AnalyticsWorker<A: ApiClient> {
    api: Arc<A>,
    receiver: mpsc::Receiver<AnalyticsEvent>,
}

impl ChannelAnalytics {
    pub fn new<A: ApiClient>(api: Arc<A>, capacity: usize) -> (Self, AnalyticsWorker<A>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (ChannelAnalytics { sender }, AnalyticsWorker { api, receiver })
    }

    /// Creates the sink and spawns its worker on the current tokio runtime.
    pub fn spawn<A>(api: Arc<A>, capacity: usize) -> Self
    where
        A: ApiClient + Send + Sync + 'static,
    {
        let (sink, worker) = Self::new(api, capacity);
        tokio::spawn(worker.run());
        sink
    }
}

impl AnalyticsSink for ChannelAnalytics {
    fn emit(&self, event: AnalyticsEvent) {
        if let Err(_err) = self.sender.try_send(event) {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dropping analytics event: {_err}");
        }
    }
}

impl<A: ApiClient> AnalyticsWorker<A> {
    /// Sends queued events until every sink handle is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.receiver.recv().await {
            if let Err(_err) = self.api.as_ref().log_analytics(&event).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("Analytics event '{}' not delivered: {_err}", event.event_name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_prefixed() {
        let factory = AnalyticsRequestFactory::new("stripe_android");
        let event = factory.create_challenge(
            AnalyticsEventName::Auth3ds2ChallengePresented,
            "pi_123",
            "04",
        );
        assert_eq!(
            event.event_name(),
            "stripe_android.3ds2_challenge_flow_presented"
        );
        assert_eq!(event.param(PARAM_INTENT_ID), Some("pi_123"));
        assert_eq!(event.param(PARAM_UI_TYPE), Some("oob"));
    }

    #[test]
    fn test_ui_type_names() {
        assert_eq!(ui_type_name("01"), "text");
        assert_eq!(ui_type_name("05"), "html");
        assert_eq!(ui_type_name(""), "none");
        assert_eq!(ui_type_name("99"), "none");
    }

    #[test]
    fn test_challenge_error_params() {
        let factory = AnalyticsRequestFactory::new("sdk");
        let event =
            factory.create_challenge_error("seti_1", "201", "Required element missing", None, None);
        assert_eq!(event.event_name(), "sdk.3ds2_challenge_flow_errored");
        assert_eq!(event.param(PARAM_ERROR_CODE), Some("201"));
        assert_eq!(event.param(PARAM_ERROR_DETAILS), None);
        assert_eq!(event.param(PARAM_TRANSACTION_ID), None);

        let event = factory.create_challenge_error(
            "seti_1",
            "201",
            "Required element missing",
            Some("eci"),
            Some("trans_1"),
        );
        assert_eq!(event.param(PARAM_ERROR_DETAILS), Some("eci"));
        assert_eq!(event.param(PARAM_TRANSACTION_ID), Some("trans_1"));
    }
}
