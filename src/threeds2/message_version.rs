use crate::errors::{Error, Result};

/// 3DS2 protocol versions this SDK speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageVersionRegistry {
    current: &'static str,
    supported: &'static [&'static str],
}

impl Default for MessageVersionRegistry {
    fn default() -> Self {
        MessageVersionRegistry {
            current: "2.1.0",
            supported: &["2.1.0", "2.2.0"],
        }
    }
}

impl MessageVersionRegistry {
    /// Version used when creating new transactions.
    pub fn current(&self) -> &'static str {
        self.current
    }

    pub fn is_supported(&self, version: &str) -> bool {
        self.supported.contains(&version)
    }

    pub fn ensure_supported(&self, version: &str) -> Result<()> {
        if self.is_supported(version) {
            Ok(())
        } else {
            Err(Error::UnsupportedMessageVersion(version.to_string()))
        }
    }
}
