use std::{fmt::Display, str::FromStr};

use crate::errors::Error;

/// Public key algorithm a directory server encrypts device data with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
}

/// A card network's 3DS2 directory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryServer {
    Visa,
    Mastercard,
    Amex,
    Discover,
    CartesBancaires,
}

impl DirectoryServer {
    pub const ALL: [DirectoryServer; 5] = [
        DirectoryServer::Visa,
        DirectoryServer::Mastercard,
        DirectoryServer::Amex,
        DirectoryServer::Discover,
        DirectoryServer::CartesBancaires,
    ];

    /// Registered application provider identifier.
    pub fn id(&self) -> &'static str {
        match self {
            DirectoryServer::Visa => "A000000003",
            DirectoryServer::Mastercard => "A000000004",
            DirectoryServer::Amex => "A000000025",
            DirectoryServer::Discover => "A000000152",
            DirectoryServer::CartesBancaires => "A000000042",
        }
    }

    /// Names the API uses for this server in `directory_server_name`.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            DirectoryServer::Visa => &["visa"],
            DirectoryServer::Mastercard => &["mastercard"],
            DirectoryServer::Amex => &["american_express", "amex"],
            DirectoryServer::Discover => &["discover"],
            DirectoryServer::CartesBancaires => &["cartes_bancaires"],
        }
    }

    pub fn name(&self) -> &'static str {
        self.names()[0]
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            DirectoryServer::CartesBancaires => KeyAlgorithm::Ec,
            _ => KeyAlgorithm::Rsa,
        }
    }

    /// Looks up a server by its API name, case-insensitively.
    pub fn lookup(name: &str) -> Option<DirectoryServer> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ds| ds.names().iter().any(|n| *n == name))
    }

    pub fn lookup_by_id(id: &str) -> Option<DirectoryServer> {
        Self::ALL.into_iter().find(|ds| ds.id() == id)
    }
}

impl FromStr for DirectoryServer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DirectoryServer::lookup(s).ok_or_else(|| Error::UnsupportedDirectoryServer(s.to_string()))
    }
}

impl Display for DirectoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
