use sha3::{Digest, Keccak256};

use crate::model::ChainId;

struct NetworkInfo {
    chain: u64,
    name: &'static str,
    explorer: Option<&'static str>,
}

const NETWORKS: &[NetworkInfo] = &[
    NetworkInfo { chain: 0x1, name: "Ethereum", explorer: Some("https://etherscan.io/") },
    NetworkInfo { chain: 0x3, name: "Ropsten", explorer: Some("https://ropsten.etherscan.io/") },
    NetworkInfo { chain: 0x4, name: "Rinkeby", explorer: Some("https://rinkeby.etherscan.io/") },
    NetworkInfo { chain: 0x5, name: "Goerli", explorer: Some("https://goerli.etherscan.io/") },
    NetworkInfo { chain: 0x2a, name: "Kovan", explorer: Some("https://kovan.etherscan.io/") },
    NetworkInfo { chain: 0x19, name: "Cronos", explorer: Some("https://cronoscan.com/") },
    NetworkInfo { chain: 0x38, name: "Smart Chain", explorer: Some("https://bscscan.com/") },
    NetworkInfo {
        chain: 0x61,
        name: "Smart Chain Testnet",
        explorer: Some("https://testnet.bscscan.com/"),
    },
    NetworkInfo { chain: 0x89, name: "Polygon", explorer: Some("https://polygonscan.com/") },
    NetworkInfo { chain: 0xfa, name: "Fantom", explorer: Some("https://ftmscan.com/") },
    NetworkInfo { chain: 0x539, name: "Local Chain", explorer: None },
    NetworkInfo {
        chain: 0xa869,
        name: "Avalanche Fuji",
        explorer: Some("https://testnet.snowtrace.io/"),
    },
    NetworkInfo { chain: 0xa86a, name: "Avalanche", explorer: Some("https://snowtrace.io/") },
    NetworkInfo {
        chain: 0x13881,
        name: "Mumbai",
        explorer: Some("https://mumbai.polygonscan.com/"),
    },
];

fn network(chain: ChainId) -> Option<&'static NetworkInfo> {
    NETWORKS.iter().find(|info| info.chain == chain.0)
}

/// Block explorer base URL, with trailing slash.
pub fn explorer_url(chain: ChainId) -> Option<&'static str> {
    network(chain).and_then(|info| info.explorer)
}

pub fn network_name(chain: ChainId) -> &'static str {
    network(chain).map(|info| info.name).unwrap_or("Unknown network")
}

pub fn transaction_link(chain: ChainId, transaction_hash: &str) -> Option<String> {
    explorer_url(chain).map(|base| format!("{}tx/{}", base, transaction_hash))
}

/// Shortens `text` to its first and last `n` characters.
pub fn ellipsis_text(text: &str, n: usize) -> String {
    let count = text.chars().count();
    if count <= n * 2 {
        return text.to_string();
    }
    let head: String = text.chars().take(n).collect();
    let tail: String = text.chars().skip(count - n).collect();
    format!("{}...{}", head, tail)
}

fn strip_hex_prefix(address: &str) -> &str {
    let address = address.trim();
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
}

/// Hex addresses compare case-insensitively; indexers lowercase them, configs checksum them.
pub fn same_address(a: &str, b: &str) -> bool {
    strip_hex_prefix(a).eq_ignore_ascii_case(strip_hex_prefix(b))
}

/// EIP-55 mixed-case checksum, returned with a `0x` prefix.
pub fn to_checksum_address(address: &str) -> String {
    let address = strip_hex_prefix(address).to_lowercase();
    let hash = {
        let mut hasher = Keccak256::new();
        hasher.update(address.as_bytes());
        hex::encode(hasher.finalize())
    };

    let checksummed: String = address
        .chars()
        .zip(hash.chars())
        .map(|(c, hash_char)| {
            if c.is_ascii_alphabetic() && hash_char >= '8' {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{}", checksummed)
}
