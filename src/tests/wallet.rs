//! Wallet address derivation and keychain payload tests

use bip39::{Language, Mnemonic};
use secp256k1::SecretKey;

use crate::config::DappSettings;
use crate::networks::to_checksum_address;
use crate::wallet::{
    address_from_mnemonic, address_from_secret_key, resolve_wallet_address, KeychainError,
    KeychainManager, StoredWallet,
};

use super::test_utils::TestVectors;

fn is_lower_hex_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[test]
fn test_address_from_secret_key_one() {
    let mut key_bytes = [0u8; 32];
    key_bytes[31] = 1;
    let secret_key = SecretKey::from_slice(&key_bytes).unwrap();

    let address = address_from_secret_key(&secret_key);
    assert_eq!(address, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    assert_eq!(
        to_checksum_address(&address),
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
    );
}

#[test]
fn test_address_from_mnemonic_uses_seed_prefix() {
    let address = address_from_mnemonic(TestVectors::TEST_MNEMONIC_12).unwrap();
    assert!(is_lower_hex_address(&address), "unexpected format: {}", address);

    let seed = Mnemonic::parse_in_normalized(Language::English, TestVectors::TEST_MNEMONIC_12)
        .unwrap()
        .to_seed("");
    let secret_key = SecretKey::from_slice(&seed[..32]).unwrap();
    assert_eq!(address, address_from_secret_key(&secret_key));

    // Deterministic
    assert_eq!(address, address_from_mnemonic(TestVectors::TEST_MNEMONIC_12).unwrap());
}

#[test]
fn test_invalid_mnemonics_are_rejected() {
    for mnemonic in [
        TestVectors::INVALID_MNEMONIC_WRONG_COUNT,
        TestVectors::INVALID_MNEMONIC_BAD_CHECKSUM,
        "",
    ] {
        let result = address_from_mnemonic(mnemonic);
        assert!(
            matches!(result, Err(KeychainError::Derivation(_))),
            "mnemonic {:?} should fail",
            mnemonic
        );
    }
}

#[test]
fn test_checksum_address_vectors() {
    for expected in [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ] {
        assert_eq!(to_checksum_address(&expected.to_lowercase()), expected);
        assert_eq!(to_checksum_address(&expected[2..]), expected);
    }
}

#[test]
fn test_stored_wallet_parsing() {
    let wallet = StoredWallet::from_json(&format!(
        r#"{{"mnemonic": "{}", "created_at": 1234567890}}"#,
        TestVectors::TEST_MNEMONIC_12
    ))
    .unwrap();
    assert_eq!(wallet.mnemonic, TestVectors::TEST_MNEMONIC_12);
    assert_eq!(wallet.created_at, 1234567890);

    let without_timestamp = StoredWallet::from_json(r#"{"mnemonic": "abandon about"}"#).unwrap();
    assert_eq!(without_timestamp.created_at, 0);

    assert!(matches!(
        StoredWallet::from_json(r#"{"mnemonic": "  "}"#),
        Err(KeychainError::Deserialize(_))
    ));
    assert!(matches!(StoredWallet::from_json("garbage"), Err(KeychainError::Deserialize(_))));
}

#[test]
fn test_settings_wallet_overrides_keychain() {
    let settings = DappSettings {
        wallet_address: Some(" 0xabc0000000000000000000000000000000000001 ".to_string()),
        ..DappSettings::default()
    };
    let keychain = KeychainManager::new("bundle-claim-test-service-unused", "nobody");

    let address = resolve_wallet_address(&settings, &keychain).unwrap();
    assert_eq!(address, "0xabc0000000000000000000000000000000000001");
}

#[test]
fn test_keychain_error_messages() {
    assert_eq!(KeychainError::NotFound.to_string(), "Wallet not found in keychain");
    assert!(KeychainError::Derivation("bad".to_string()).to_string().contains("bad"));
}
