//! Native 3-D Secure 2 protocol pieces: directory servers, fingerprints, wire
//! parameters, challenge outcomes and the receiver that translates them.

pub mod auth_params;
pub mod auth_result;
pub mod challenge;
pub mod directory_server;
pub mod fingerprint;
pub mod message_version;
pub mod receiver;
pub mod transaction;
