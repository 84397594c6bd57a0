use std::ops::Deref;

use crate::{
    concepts::Transaction,
    threeds2::{
        directory_server::KeyAlgorithm,
        fingerprint::{AuthenticationFingerprint, Certificate},
    },
};

/// Everything the 3DS2 service needs to open a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransactionParams {
    pub directory_server_id: String,
    pub message_version: String,
    pub is_live_mode: bool,
    pub directory_server_name: String,
    pub root_certificates: Vec<Certificate>,
    pub public_key: Certificate,
    pub key_algorithm: KeyAlgorithm,
    pub key_id: Option<String>,
}

impl CreateTransactionParams {
    pub fn new(fingerprint: &AuthenticationFingerprint, is_live_mode: bool) -> Self {
        CreateTransactionParams {
            directory_server_id: fingerprint.directory_server_id.clone(),
            message_version: fingerprint.message_version.clone(),
            is_live_mode,
            directory_server_name: fingerprint.directory_server_name.clone(),
            root_certificates: fingerprint.root_certificates.clone(),
            public_key: fingerprint.directory_server_public_key.clone(),
            key_algorithm: fingerprint.key_algorithm,
            key_id: fingerprint.key_id.clone(),
        }
    }
}

/// SDK-generated values sent to the authenticate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequestParameters {
    pub sdk_app_id: String,
    pub sdk_transaction_id: String,
    pub device_data: String,
    /// JSON encoded ephemeral public key (JWK).
    pub sdk_ephemeral_public_key: String,
    pub sdk_reference_number: String,
    pub message_version: String,
}

/// Owns a [`Transaction`] and closes it when dropped.
///
/// Every exit path of an attempt drops its guard, so the transaction is released on
/// success, failure, cancellation and fallback alike.
#[derive(Debug)]
pub struct TransactionGuard<T: Transaction> {
    transaction: T,
}

impl<T: Transaction> TransactionGuard<T> {
    pub fn new(transaction: T) -> Self {
        TransactionGuard { transaction }
    }
}

impl<T: Transaction> Deref for TransactionGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl<T: Transaction> Drop for TransactionGuard<T> {
    fn drop(&mut self) {
        self.transaction.close();
    }
}
