//! Engine configuration
//!
//! Defaults applied wherever a store definition carries zero-valued timeouts.

/// Tunables for location expansion and content resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotConfig {
    /// Per-request timeout applied to remotes with no explicit timeout
    pub request_timeout_seconds: u32,
    /// Content cache validity applied to remotes with no explicit timeout
    pub cache_timeout_seconds: u32,
    /// Metadata cache validity applied to remotes with no explicit timeout
    pub metadata_timeout_seconds: u32,
    /// Not-found-cache validity applied to remotes with no explicit timeout
    pub nfc_timeout_seconds: u32,
    /// Re-enable delay for auto-disabled stores with no explicit timeout
    pub disable_timeout_seconds: u32,
}

impl DepotConfig {
    /// Create a config with default tunables
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout default (builder style)
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: u32) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Set the content cache timeout default (builder style)
    #[must_use]
    pub fn with_cache_timeout(mut self, seconds: u32) -> Self {
        self.cache_timeout_seconds = seconds;
        self
    }

    /// Set the not-found-cache timeout default (builder style)
    #[must_use]
    pub fn with_nfc_timeout(mut self, seconds: u32) -> Self {
        self.nfc_timeout_seconds = seconds;
        self
    }
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
            cache_timeout_seconds: 86_400,
            metadata_timeout_seconds: 86_400,
            nfc_timeout_seconds: 300,
            disable_timeout_seconds: 1_800,
        }
    }
}
