use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::path::Path;

use bevy::log::info;
use serde::{Deserialize, Serialize};

use crate::abi::DEFAULT_ASSEMBLY_ABI;
use crate::claim::DappContext;
use crate::model::ChainId;

/// Environment variable naming a JSON settings file.
pub const CONFIG_ENV_VAR: &str = "BUNDLE_CLAIM_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read settings: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse settings: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DappSettings {
    // Base URLs for the off-chain services
    pub indexer_base_url: String,
    pub relay_base_url: String,

    // Endpoint templates
    /// Assembly event lookup (e.g., "/api/{chain}/{contract}/AssemblyEvent")
    pub assembly_event_endpoint: String,
    /// Contract write relay (e.g., "/api/{chain}/execute")
    pub execute_endpoint: String,
    /// Owned NFTs listing (e.g., "/api/{chain}/{owner}/nfts")
    pub nfts_endpoint: String,

    // Chain context
    /// Active chain, hex ("0x1") or decimal ("1")
    pub chain_id: String,
    /// Skips the keychain when set
    pub wallet_address: Option<String>,
    pub assembly_abi: Option<String>,
    pub assembly_abi_path: Option<String>,
    pub default_factory_address: String,
    /// Per-chain factory overrides, keyed by chain id
    pub factory_addresses: HashMap<String, String>,

    // Client behaviour
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    // Keychain entry holding the wallet mnemonic
    pub keychain_service: String,
    pub keychain_user: String,
}

impl Default for DappSettings {
    fn default() -> Self {
        Self {
            indexer_base_url: "http://localhost:3000".to_string(),
            relay_base_url: "http://localhost:4000".to_string(),
            assembly_event_endpoint: "/api/{chain}/{contract}/AssemblyEvent".to_string(),
            execute_endpoint: "/api/{chain}/execute".to_string(),
            nfts_endpoint: "/api/{chain}/{owner}/nfts".to_string(),
            chain_id: "0x1".to_string(),
            wallet_address: None,
            assembly_abi: None,
            assembly_abi_path: None,
            default_factory_address: "0x0000000000000000000000000000000000000000".to_string(),
            factory_addresses: HashMap::new(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            keychain_service: "Bundle-Claim-Desktop".to_string(),
            keychain_user: "default-wallet".to_string(),
        }
    }
}

impl DappSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let settings: DappSettings = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Loads the file named by `BUNDLE_CLAIM_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => {
                info!("{} not set - using default settings", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    pub fn chain(&self) -> Result<ChainId, ConfigError> {
        self.chain_id
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("chain_id: {}", e)))
    }

    /// Factory for `chain`, falling back to `default_factory_address`.
    pub fn factory_address_for(&self, chain: ChainId) -> &str {
        self.factory_addresses
            .iter()
            .find(|(key, _)| key.parse::<ChainId>().map(|c| c == chain).unwrap_or(false))
            .map(|(_, address)| address.as_str())
            .unwrap_or(&self.default_factory_address)
    }

    /// Inline ABI wins over the file; the built-in ABI is the last resort.
    pub fn abi_json(&self) -> Result<String, ConfigError> {
        if let Some(abi) = &self.assembly_abi {
            return Ok(abi.clone());
        }
        if let Some(path) = &self.assembly_abi_path {
            return std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Io(format!("{}: {}", path, e)));
        }
        Ok(DEFAULT_ASSEMBLY_ABI.to_string())
    }

    pub fn dapp_context(&self, wallet_address: &str) -> Result<DappContext, ConfigError> {
        let chain = self.chain()?;
        let abi_json = self.abi_json()?;
        let factory = self.factory_address_for(chain);

        DappContext::new(wallet_address, chain, &abi_json, factory)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
