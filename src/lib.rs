//! 3-D Secure 2 authentication orchestration for payment and setup intents.
//!
//! The [`controller::PaymentController`] inspects an intent's next action, drives the
//! native 3DS2 transaction or a browser redirect, and reports a single outcome through
//! the host. Everything platform specific sits behind the traits in [`concepts`].

pub mod analytics;
pub mod concepts;
pub mod config;
pub mod controller;
pub mod ephemeral_key;
pub mod errors;
pub mod threeds2;
pub mod types;

#[cfg(feature = "api-client")]
pub mod stripe_client;
