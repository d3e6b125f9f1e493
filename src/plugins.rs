//! Provider plugins required by the cluster graph, pinned to exact versions

use std::fmt;

/// Resource providers the cluster graph declares resources against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    AzureNextgen,
    AzureAd,
    Random,
    Tls,
}

impl Provider {
    /// Installation order
    pub const ALL: [Provider; 4] = [
        Provider::AzureNextgen,
        Provider::AzureAd,
        Provider::Random,
        Provider::Tls,
    ];

    /// Plugin name as the engine knows it
    pub fn name(&self) -> &'static str {
        match self {
            Provider::AzureNextgen => "azure-nextgen",
            Provider::AzureAd => "azuread",
            Provider::Random => "random",
            Provider::Tls => "tls",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Provider::AzureNextgen => "v0.2.2",
            Provider::AzureAd => "v2.5.1",
            Provider::Random => "v2.3.1",
            Provider::Tls => "v2.3.0",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.version())
    }
}
