use std::error::Error as StdError;
use std::fmt;

use bevy::log::info;
use bip39::{Language, Mnemonic};
use keyring::Entry;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::config::DappSettings;

// Keychain Management
#[derive(Debug)]
pub enum KeychainError {
    NotFound,
    Access(String),
    Deserialize(String),
    Derivation(String),
}

impl fmt::Display for KeychainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeychainError::NotFound => write!(f, "Wallet not found in keychain"),
            KeychainError::Access(msg) => write!(f, "Keychain access error: {}", msg),
            KeychainError::Deserialize(msg) => write!(f, "Deserialization error: {}", msg),
            KeychainError::Derivation(msg) => write!(f, "Key derivation error: {}", msg),
        }
    }
}

impl StdError for KeychainError {}

/// What the desktop wallet stores in the keychain entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWallet {
    pub mnemonic: String,
    #[serde(default)]
    pub created_at: u64,
}

impl StoredWallet {
    pub fn from_json(json: &str) -> Result<Self, KeychainError> {
        let wallet: StoredWallet = serde_json::from_str(json.trim())
            .map_err(|e| KeychainError::Deserialize(e.to_string()))?;
        if wallet.mnemonic.trim().is_empty() {
            return Err(KeychainError::Deserialize("Missing mnemonic".to_string()));
        }
        Ok(wallet)
    }
}

/// Read-only view of the wallet kept in the OS keychain.
pub struct KeychainManager {
    service_name: String,
    username: String,
}

impl KeychainManager {
    pub fn new(service_name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            username: username.into(),
        }
    }

    pub fn from_settings(settings: &DappSettings) -> Self {
        Self::new(settings.keychain_service.clone(), settings.keychain_user.clone())
    }

    pub fn load_wallet(&self) -> Result<StoredWallet, KeychainError> {
        let entry = Entry::new(&self.service_name, &self.username)
            .map_err(|e| KeychainError::Access(format!("Failed to create keychain entry: {}", e)))?;

        let json_data = entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            _ => KeychainError::Access(format!("Failed to load wallet from keychain: {}", e)),
        })?;

        StoredWallet::from_json(&json_data)
    }

    pub fn wallet_address(&self) -> Result<String, KeychainError> {
        let wallet = self.load_wallet()?;
        let address = address_from_mnemonic(&wallet.mnemonic)?;
        info!("Wallet loaded from keychain service {}: {}", self.service_name, address);
        Ok(address)
    }
}

/// Ethereum address for a mnemonic, using the desktop wallet's derivation
/// (first 32 seed bytes as the secp256k1 key).
pub fn address_from_mnemonic(mnemonic: &str) -> Result<String, KeychainError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, mnemonic)
        .map_err(|e| KeychainError::Derivation(format!("Invalid mnemonic: {}", e)))?;

    let seed = mnemonic.to_seed("");
    let secret_key = SecretKey::from_slice(&seed[..32])
        .map_err(|e| KeychainError::Derivation(format!("Failed to create private key: {}", e)))?;

    Ok(address_from_secret_key(&secret_key))
}

pub fn address_from_secret_key(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::new();
    let public_key = PublicKey::from_secret_key(&secp, secret_key);
    let public_key_bytes = public_key.serialize_uncompressed();

    // Last 20 bytes of keccak256 over the key without its 0x04 prefix
    let mut hasher = Keccak256::new();
    hasher.update(&public_key_bytes[1..]);
    let hash = hasher.finalize();
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Settings override first, then the keychain.
pub fn resolve_wallet_address(
    settings: &DappSettings,
    keychain: &KeychainManager,
) -> Result<String, KeychainError> {
    match settings.wallet_address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() => {
            info!("Using wallet address from settings: {}", address);
            Ok(address.to_string())
        }
        _ => keychain.wallet_address(),
    }
}
