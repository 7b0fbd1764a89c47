//! Test modules for the bundle claim control
//!
//! Coverage:
//! - Claim flow (picker selection, contract resolution, notifications)
//! - Wire and settings parsing (unlock data, relay receipts, ABI, chain ids)
//! - Wallet address derivation and explorer helpers


#[cfg(test)]
pub mod parsing;

#[cfg(test)]
pub mod wallet;
