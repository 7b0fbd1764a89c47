use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ClaimError;
use crate::model::BurnParams;

/// ABI of the bundle (assembly) contract, limited to what the claim flow touches.
pub const DEFAULT_ASSEMBLY_ABI: &str = r#"[
  {
    "type": "function",
    "name": "burn",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "_to", "type": "address", "internalType": "address" },
      { "name": "_tokenId", "type": "uint256", "internalType": "uint256" },
      { "name": "_salt", "type": "uint256", "internalType": "uint256" },
      { "name": "_addresses", "type": "address[]", "internalType": "address[]" },
      { "name": "_numbers", "type": "uint256[]", "internalType": "uint256[]" }
    ],
    "outputs": []
  },
  {
    "type": "event",
    "name": "Transfer",
    "anonymous": false,
    "inputs": [
      { "name": "from", "type": "address", "indexed": true },
      { "name": "to", "type": "address", "indexed": true },
      { "name": "tokenId", "type": "uint256", "indexed": true }
    ]
  },
  {
    "type": "event",
    "name": "AssemblyAsset",
    "anonymous": false,
    "inputs": [
      { "name": "firstHolder", "type": "address", "indexed": true },
      { "name": "tokenId", "type": "uint256", "indexed": false },
      { "name": "salt", "type": "uint256", "indexed": false },
      { "name": "addresses", "type": "address[]", "indexed": false },
      { "name": "numbers", "type": "uint256[]", "indexed": false }
    ]
  }
]"#;

const TRANSFER_EVENT: &str = "Transfer";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "internalType", default)]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub indexed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbiItem {
    #[serde(rename = "type", default = "default_item_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
}

// Solidity ABI entries without a type are functions.
fn default_item_kind() -> String {
    "function".to_string()
}

/// Parsed once at start-up and shared read-only with every claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractAbi {
    raw: Value,
    items: Vec<AbiItem>,
}

impl ContractAbi {
    pub fn parse(json: &str) -> Result<Self, ClaimError> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| ClaimError::Abi(format!("Invalid ABI JSON: {}", e)))?;
        let items: Vec<AbiItem> = serde_json::from_value(raw.clone())
            .map_err(|e| ClaimError::Abi(format!("ABI is not a list of entries: {}", e)))?;

        Ok(Self { raw, items })
    }

    pub fn function(&self, name: &str) -> Option<&AbiItem> {
        self.items
            .iter()
            .find(|item| item.kind == "function" && item.name.as_deref() == Some(name))
    }

    pub fn event(&self, name: &str) -> Option<&AbiItem> {
        self.items
            .iter()
            .find(|item| item.kind == "event" && item.name.as_deref() == Some(name))
    }

    /// Confirms `burn` exists and takes its arguments in the order `BurnParams` sends them,
    /// and that the contract emits the `Transfer` event the receipt is read from.
    pub fn ensure_burn(&self) -> Result<&AbiItem, ClaimError> {
        let burn = self
            .function(BurnParams::FUNCTION_NAME)
            .ok_or_else(|| ClaimError::Abi("contract ABI has no burn function".to_string()))?;

        let names: Vec<&str> = burn.inputs.iter().map(|input| input.name.as_str()).collect();
        if names != BurnParams::INPUT_NAMES {
            return Err(ClaimError::Abi(format!(
                "burn inputs {:?} do not match expected {:?}",
                names,
                BurnParams::INPUT_NAMES
            )));
        }
        if self.event(TRANSFER_EVENT).is_none() {
            return Err(ClaimError::Abi("contract ABI has no Transfer event".to_string()));
        }

        Ok(burn)
    }
}

impl Serialize for ContractAbi {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}
