//! Desktop control for unpacking bundle NFTs: pick (or type) a bundle, fetch
//! its unlock proof from the indexer, burn it through the transaction relay
//! and report the result.

pub mod abi;
pub mod claim;
pub mod config;
pub mod error;
pub mod model;
pub mod networks;
pub mod services;
pub mod wallet;

pub use claim::{BundleClaim, ClaimJob, ClaimOutcome, ClaimPhase, ClaimResult, DappContext};
pub use config::{ConfigError, DappSettings};
pub use error::ClaimError;

#[cfg(test)]
mod tests;
