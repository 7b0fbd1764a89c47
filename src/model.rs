use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::abi::ContractAbi;
use crate::error::ClaimError;

/// A JSON scalar that may arrive quoted or bare. Token ids and uint256
/// values come back as strings from most indexers but as numbers from some.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Num(serde_json::Number),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Str(s) => s,
            Scalar::Num(n) => n.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(String::from)
}

fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Scalar>::deserialize(deserializer)?;
    Ok(values.into_iter().map(String::from).collect())
}

/// One owned NFT, in the shape the NFT inventory API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(deserialize_with = "scalar_string")]
    pub token_id: String,
    pub token_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_of: Option<String>,
}

impl AssetRecord {
    pub fn new(token_id: impl Into<String>, token_address: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            token_address: token_address.into(),
            name: None,
            symbol: None,
            contract_type: None,
            amount: None,
            owner_of: None,
        }
    }

    /// Label used by the picker list.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} #{}", name, self.token_id),
            None => format!("Bundle #{}", self.token_id),
        }
    }
}

/// Picker result. Only the first record is acted upon.
pub type BundleSelection = Vec<AssetRecord>;

/// Proof material the bundle contract needs to authorise the burn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnlockData {
    pub addresses: Vec<String>,
    pub numbers: Vec<String>,
    pub salt: String,
}

impl UnlockData {
    /// Builds from the lookup's `(addresses, numbers, salt)` order.
    pub fn from_tuple((addresses, numbers, salt): (Vec<String>, Vec<String>, String)) -> Self {
        Self {
            addresses,
            numbers,
            salt,
        }
    }
}

/// Indexer reply for an assembly event, either keyed or as a bare triple.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssemblyEventResponse {
    Keyed {
        #[serde(deserialize_with = "scalar_strings")]
        addresses: Vec<String>,
        #[serde(deserialize_with = "scalar_strings")]
        numbers: Vec<String>,
        #[serde(deserialize_with = "scalar_string")]
        salt: String,
    },
    Triple(Vec<String>, Vec<Scalar>, Scalar),
}

impl From<AssemblyEventResponse> for UnlockData {
    fn from(response: AssemblyEventResponse) -> Self {
        match response {
            AssemblyEventResponse::Keyed {
                addresses,
                numbers,
                salt,
            } => UnlockData::from_tuple((addresses, numbers, salt)),
            AssemblyEventResponse::Triple(addresses, numbers, salt) => UnlockData::from_tuple((
                addresses,
                numbers.into_iter().map(String::from).collect(),
                salt.into(),
            )),
        }
    }
}

/// Arguments of `burn`, serialised in the contract's parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnParams {
    #[serde(rename = "_to")]
    pub to: String,
    #[serde(rename = "_tokenId")]
    pub token_id: String,
    #[serde(rename = "_salt")]
    pub salt: String,
    #[serde(rename = "_addresses")]
    pub addresses: Vec<String>,
    #[serde(rename = "_numbers")]
    pub numbers: Vec<String>,
}

impl BurnParams {
    pub const FUNCTION_NAME: &'static str = "burn";
    pub const INPUT_NAMES: [&'static str; 5] =
        ["_to", "_tokenId", "_salt", "_addresses", "_numbers"];

    pub fn new(to: impl Into<String>, token_id: impl Into<String>, unlock: UnlockData) -> Self {
        Self {
            to: to.into(),
            token_id: token_id.into(),
            salt: unlock.salt,
            addresses: unlock.addresses,
            numbers: unlock.numbers,
        }
    }
}

/// Contract write handed to the transaction relay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub contract_address: String,
    pub function_name: String,
    pub abi: Arc<ContractAbi>,
    pub params: BurnParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferReturnValues {
    #[serde(rename = "tokenId", default, deserialize_with = "optional_scalar")]
    pub token_id: Option<String>,
}

fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferEvent {
    #[serde(rename = "returnValues", default)]
    pub return_values: Option<TransferReturnValues>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionEvents {
    #[serde(rename = "Transfer", default)]
    pub transfer: Option<TransferEvent>,
}

/// Raw relay reply. Every field is optional so a partial body can be
/// reported as malformed rather than as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionResponse {
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub events: Option<TransactionEvents>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Validated outcome of a successful burn.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReceipt {
    pub transaction_hash: String,
    pub token_id: String,
}

impl TryFrom<TransactionResponse> for ExecutionReceipt {
    type Error = ClaimError;

    fn try_from(response: TransactionResponse) -> Result<Self, Self::Error> {
        if let Some(error) = response.error {
            return Err(ClaimError::Execution(error.to_string()));
        }

        let transaction_hash = response
            .transaction_hash
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| ClaimError::MalformedResponse("missing transactionHash".to_string()))?;

        let token_id = response
            .events
            .and_then(|events| events.transfer)
            .and_then(|transfer| transfer.return_values)
            .and_then(|values| values.token_id)
            .ok_or_else(|| {
                ClaimError::MalformedResponse("missing Transfer.returnValues.tokenId".to_string())
            })?;

        Ok(Self {
            transaction_hash,
            token_id,
        })
    }
}

/// EVM chain id. Accepts `"0x1"` or `"1"`, prints as hex like wallet providers do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl FromStr for ChainId {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|e| ClaimError::Parse(format!("Invalid chain id '{}': {}", s, e)))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
