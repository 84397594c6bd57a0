use base64::{Engine, prelude::BASE64_STANDARD};

use crate::{
    errors::{Error, Result},
    threeds2::{
        directory_server::{DirectoryServer, KeyAlgorithm},
        message_version::MessageVersionRegistry,
    },
    types::Use3ds2Data,
};

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";
const DER_SEQUENCE_TAG: u8 = 0x30;

/// A DER encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    /// Decodes a PEM block or a bare base64 DER string.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let body = pem_body(encoded)?;
        let der = BASE64_STANDARD
            .decode(body)
            .map_err(|err| Error::MalformedCertificate(format!("invalid base64: {err}")))?;

        match der.first() {
            Some(&DER_SEQUENCE_TAG) => Ok(Certificate(der)),
            Some(_) => Err(Error::MalformedCertificate(
                "certificate is not a DER sequence".to_string(),
            )),
            None => Err(Error::MalformedCertificate("certificate is empty".to_string())),
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Certificate({} bytes)", self.0.len())
    }
}

fn pem_body(encoded: &str) -> Result<String> {
    let encoded = encoded.trim();
    if !encoded.starts_with(PEM_BEGIN) {
        return Ok(encoded.split_whitespace().collect());
    }

    let mut lines = encoded.lines().map(str::trim);
    // Skip the BEGIN line.
    lines.next();
    let mut body = String::new();
    for line in lines {
        if line.starts_with(PEM_END) {
            return Ok(body);
        }
        body.push_str(line);
    }
    Err(Error::MalformedCertificate(
        "PEM block has no END line".to_string(),
    ))
}

/// Protocol parameters derived from one intent's 3DS2 payload.
///
/// Attempt scoped: a new fingerprint is derived for every authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationFingerprint {
    pub directory_server: DirectoryServer,
    pub directory_server_id: String,
    pub directory_server_name: String,
    pub server_transaction_id: String,
    pub source: String,
    pub root_certificates: Vec<Certificate>,
    pub directory_server_public_key: Certificate,
    pub key_algorithm: KeyAlgorithm,
    pub key_id: Option<String>,
    pub message_version: String,
}

impl AuthenticationFingerprint {
    pub fn derive(data: &Use3ds2Data, versions: &MessageVersionRegistry) -> Result<Self> {
        let directory_server = DirectoryServer::lookup(&data.server_name)
            .ok_or_else(|| Error::UnsupportedDirectoryServer(data.server_name.clone()))?;

        // A payload id must name the same registry entry as the network name.
        let encryption = &data.server_encryption;
        let payload_id = encryption.directory_server_id.trim();
        if !payload_id.is_empty()
            && DirectoryServer::lookup_by_id(payload_id) != Some(directory_server)
        {
            return Err(Error::UnsupportedDirectoryServer(format!(
                "{} does not match directory server id {payload_id}",
                data.server_name
            )));
        }

        let directory_server_public_key = Certificate::from_encoded(&encryption.ds_certificate)?;
        let root_certificates = encryption
            .root_certificate_authorities
            .iter()
            .map(|c| Certificate::from_encoded(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(AuthenticationFingerprint {
            directory_server,
            directory_server_id: directory_server.id().to_string(),
            directory_server_name: directory_server.name().to_string(),
            server_transaction_id: data.transaction_id.clone(),
            source: data.source.clone(),
            root_certificates,
            directory_server_public_key,
            key_algorithm: directory_server.key_algorithm(),
            key_id: encryption.key_id.clone(),
            message_version: versions.current().to_string(),
        })
    }
}
