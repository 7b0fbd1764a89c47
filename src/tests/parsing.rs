//! Wire formats, ABI handling and settings parsing

use std::collections::HashMap;

use serde_json::json;

use crate::abi::{ContractAbi, DEFAULT_ASSEMBLY_ABI};
use crate::config::DappSettings;
use crate::error::ClaimError;
use crate::model::{
    AssemblyEventResponse, AssetRecord, BurnParams, ChainId, ExecutionReceipt,
    TransactionResponse, UnlockData,
};
use crate::networks::{ellipsis_text, explorer_url, network_name, same_address, transaction_link};
use crate::services::client::backoff_delay_ms;

fn receipt_from(value: serde_json::Value) -> Result<ExecutionReceipt, ClaimError> {
    let response: TransactionResponse = serde_json::from_value(value).unwrap();
    ExecutionReceipt::try_from(response)
}

#[test]
fn test_assembly_event_keyed_response() {
    let body = json!({
        "addresses": ["0xaaa", "0xbbb"],
        "numbers": ["1", 2],
        "salt": 777
    });
    let event: AssemblyEventResponse = serde_json::from_value(body).unwrap();
    let unlock = UnlockData::from(event);

    assert_eq!(unlock.addresses, vec!["0xaaa", "0xbbb"]);
    assert_eq!(unlock.numbers, vec!["1", "2"]);
    assert_eq!(unlock.salt, "777");
}

#[test]
fn test_assembly_event_triple_response() {
    let event: AssemblyEventResponse =
        serde_json::from_str(r#"[["0xaaa"], [5, "6"], "99"]"#).unwrap();
    let unlock = UnlockData::from(event);

    assert_eq!(unlock.addresses, vec!["0xaaa"]);
    assert_eq!(unlock.numbers, vec!["5", "6"]);
    assert_eq!(unlock.salt, "99");
}

#[test]
fn test_assembly_event_rejects_unrelated_body() {
    let result: Result<AssemblyEventResponse, _> =
        serde_json::from_str(r#"{"message":"not found"}"#);
    assert!(result.is_err());
}

#[test]
fn test_asset_record_accepts_numeric_token_id() {
    let record: AssetRecord = serde_json::from_value(json!({
        "token_id": 1234,
        "token_address": "0xabc",
        "name": "Starter Pack"
    }))
    .unwrap();

    assert_eq!(record.token_id, "1234");
    assert_eq!(record.label(), "Starter Pack #1234");
    assert_eq!(AssetRecord::new("7", "0xabc").label(), "Bundle #7");
}

#[test]
fn test_burn_params_serialize_in_contract_order() {
    let params = BurnParams::new(
        "0xwallet",
        "5",
        UnlockData::from_tuple((vec!["0xaaa".to_string()], vec!["9".to_string()], "3".to_string())),
    );
    let json = serde_json::to_string(&params).unwrap();

    assert_eq!(
        json,
        r#"{"_to":"0xwallet","_tokenId":"5","_salt":"3","_addresses":["0xaaa"],"_numbers":["9"]}"#
    );
}

#[test]
fn test_receipt_from_complete_response() {
    let receipt = receipt_from(json!({
        "transactionHash": "0x123",
        "events": { "Transfer": { "returnValues": { "tokenId": "99" } } }
    }))
    .unwrap();

    assert_eq!(receipt.transaction_hash, "0x123");
    assert_eq!(receipt.token_id, "99");
}

#[test]
fn test_receipt_accepts_numeric_token_id() {
    let receipt = receipt_from(json!({
        "transactionHash": "0x123",
        "events": { "Transfer": { "returnValues": { "tokenId": 99 } } }
    }))
    .unwrap();
    assert_eq!(receipt.token_id, "99");
}

#[test]
fn test_receipt_missing_fields_are_malformed() {
    let no_events = receipt_from(json!({ "transactionHash": "0x123" }));
    assert!(matches!(no_events, Err(ClaimError::MalformedResponse(_))));

    let no_hash = receipt_from(json!({
        "events": { "Transfer": { "returnValues": { "tokenId": "1" } } }
    }));
    assert!(matches!(no_hash, Err(ClaimError::MalformedResponse(_))));

    let empty_hash = receipt_from(json!({
        "transactionHash": "",
        "events": { "Transfer": { "returnValues": { "tokenId": "1" } } }
    }));
    assert!(matches!(empty_hash, Err(ClaimError::MalformedResponse(_))));
}

#[test]
fn test_receipt_with_error_is_execution_failure() {
    let result = receipt_from(json!({ "error": { "code": 4001, "message": "User denied" } }));
    match result {
        Err(ClaimError::Execution(msg)) => assert!(msg.contains("User denied")),
        other => panic!("expected execution error, got {:?}", other),
    }
}

#[test]
fn test_default_abi_has_burn_in_order() {
    let abi = ContractAbi::parse(DEFAULT_ASSEMBLY_ABI).unwrap();
    let burn = abi.ensure_burn().unwrap();

    let names: Vec<&str> = burn.inputs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, BurnParams::INPUT_NAMES);
    assert!(abi.event("Transfer").is_some());
    assert!(abi.event("AssemblyAsset").is_some());
    assert!(abi.function("Transfer").is_none());
}

#[test]
fn test_abi_rejects_reordered_burn_inputs() {
    let abi = ContractAbi::parse(
        r#"[{"name":"burn","inputs":[
            {"name":"_tokenId","type":"uint256"},
            {"name":"_to","type":"address"},
            {"name":"_salt","type":"uint256"},
            {"name":"_addresses","type":"address[]"},
            {"name":"_numbers","type":"uint256[]"}
        ]}]"#,
    )
    .unwrap();

    // Entries without a type default to functions
    assert!(abi.function("burn").is_some());
    assert!(matches!(abi.ensure_burn(), Err(ClaimError::Abi(_))));
}

#[test]
fn test_abi_requires_transfer_event() {
    let abi = ContractAbi::parse(
        r#"[{"type":"function","name":"burn","inputs":[
            {"name":"_to","type":"address"},
            {"name":"_tokenId","type":"uint256"},
            {"name":"_salt","type":"uint256"},
            {"name":"_addresses","type":"address[]"},
            {"name":"_numbers","type":"uint256[]"}
        ]}]"#,
    )
    .unwrap();

    match abi.ensure_burn() {
        Err(ClaimError::Abi(msg)) => assert!(msg.contains("Transfer")),
        other => panic!("expected missing Transfer event, got {:?}", other),
    }
}

#[test]
fn test_abi_parse_errors() {
    assert!(matches!(ContractAbi::parse("not json"), Err(ClaimError::Abi(_))));
    assert!(matches!(ContractAbi::parse(r#"{"name":"burn"}"#), Err(ClaimError::Abi(_))));

    let no_burn = ContractAbi::parse("[]").unwrap();
    assert!(matches!(no_burn.ensure_burn(), Err(ClaimError::Abi(_))));
}

#[test]
fn test_abi_serializes_as_given() {
    let abi = ContractAbi::parse(DEFAULT_ASSEMBLY_ABI).unwrap();
    let value = serde_json::to_value(&abi).unwrap();
    let expected: serde_json::Value = serde_json::from_str(DEFAULT_ASSEMBLY_ABI).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn test_chain_id_parsing() {
    assert_eq!("0x1".parse::<ChainId>().unwrap(), ChainId(1));
    assert_eq!("0X89".parse::<ChainId>().unwrap(), ChainId(137));
    assert_eq!("137".parse::<ChainId>().unwrap(), ChainId(137));
    assert_eq!(ChainId(43114).to_string(), "0xa86a");
    assert!(matches!("mainnet".parse::<ChainId>(), Err(ClaimError::Parse(_))));
}

#[test]
fn test_explorer_links() {
    assert_eq!(explorer_url(ChainId(1)), Some("https://etherscan.io/"));
    assert_eq!(
        transaction_link(ChainId(0x89), "0xabc").as_deref(),
        Some("https://polygonscan.com/tx/0xabc")
    );
    assert_eq!(transaction_link(ChainId(0x539), "0xabc"), None);
    assert_eq!(transaction_link(ChainId(999_999), "0xabc"), None);
    assert_eq!(network_name(ChainId(0x38)), "Smart Chain");
    assert_eq!(network_name(ChainId(999_999)), "Unknown network");
}

#[test]
fn test_ellipsis_text() {
    assert_eq!(ellipsis_text("0x1234567890abcdef", 4), "0x12...cdef");
    assert_eq!(ellipsis_text("12345678", 4), "12345678");
    assert_eq!(ellipsis_text("", 5), "");
}

#[test]
fn test_same_address_ignores_case_and_prefix() {
    assert!(same_address("0xABCdef", "0xabcDEF"));
    assert!(same_address("abcdef", "0xABCDEF"));
    assert!(!same_address("0xabc", "0xabd"));
}

#[test]
fn test_settings_defaults_fill_missing_fields() {
    let settings: DappSettings =
        serde_json::from_str(r#"{"chain_id": "137", "max_retries": 1}"#).unwrap();

    assert_eq!(settings.chain().unwrap(), ChainId(137));
    assert_eq!(settings.max_retries, 1);
    assert_eq!(settings.indexer_base_url, "http://localhost:3000");
    assert_eq!(settings.keychain_service, "Bundle-Claim-Desktop");
}

#[test]
fn test_factory_address_per_chain() {
    let mut factories = HashMap::new();
    factories.insert("0x89".to_string(), "0xPOLY".to_string());
    factories.insert("56".to_string(), "0xBSC".to_string());
    let settings = DappSettings {
        default_factory_address: "0xDEF".to_string(),
        factory_addresses: factories,
        ..DappSettings::default()
    };

    assert_eq!(settings.factory_address_for(ChainId(137)), "0xPOLY");
    assert_eq!(settings.factory_address_for(ChainId(0x38)), "0xBSC");
    assert_eq!(settings.factory_address_for(ChainId(1)), "0xDEF");
}

#[test]
fn test_dapp_context_from_settings() {
    let settings = DappSettings {
        chain_id: "0x5".to_string(),
        default_factory_address: "0xDEF".to_string(),
        ..DappSettings::default()
    };
    let context = settings.dapp_context("0xwallet").unwrap();

    assert_eq!(context.chain_id, ChainId(5));
    assert_eq!(context.wallet_address, "0xwallet");
    assert_eq!(context.default_factory_address, "0xDEF");
    assert!(context.abi.ensure_burn().is_ok());
}

#[test]
fn test_dapp_context_rejects_bad_settings() {
    let bad_chain = DappSettings {
        chain_id: "ethereum".to_string(),
        ..DappSettings::default()
    };
    assert!(bad_chain.dapp_context("0xwallet").is_err());

    let bad_abi = DappSettings {
        assembly_abi: Some("{".to_string()),
        ..DappSettings::default()
    };
    assert!(bad_abi.dapp_context("0xwallet").is_err());

    let missing_file = DappSettings {
        assembly_abi_path: Some("/nonexistent/bundle-abi.json".to_string()),
        ..DappSettings::default()
    };
    assert!(missing_file.abi_json().is_err());
}

#[test]
fn test_settings_load_from_file() {
    let path = std::env::temp_dir()
        .join(format!("bundle-claim-settings-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{"relay_base_url": "http://relay.local", "chain_id": "0x61"}"#,
    )
    .unwrap();

    let settings = DappSettings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.relay_base_url, "http://relay.local");
    assert_eq!(settings.chain().unwrap(), ChainId(0x61));
    assert!(DappSettings::load("/nonexistent/settings.json").is_err());
}

#[test]
fn test_only_network_errors_are_retryable() {
    assert!(ClaimError::Network("timeout".to_string()).is_retryable());
    assert!(!ClaimError::Api("500".to_string()).is_retryable());
    assert!(!ClaimError::Execution("reverted".to_string()).is_retryable());
    assert!(!ClaimError::MissingBundle.is_retryable());
}

#[test]
fn test_backoff_delay_doubles_and_saturates() {
    assert_eq!(backoff_delay_ms(1000, 0), 1000);
    assert_eq!(backoff_delay_ms(1000, 1), 2000);
    assert_eq!(backoff_delay_ms(1000, 2), 4000);
    assert_eq!(backoff_delay_ms(1000, 63), u64::MAX);
    assert_eq!(backoff_delay_ms(1000, 64), u64::MAX);
    assert_eq!(backoff_delay_ms(1, 200), u64::MAX);
    assert_eq!(backoff_delay_ms(0, 70), 0);
}
