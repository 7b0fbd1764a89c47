//! Collaborators the claim control talks to.
//!
//! Every trait is blocking and `Send + Sync` so an implementation can be moved
//! into a background task while the UI keeps rendering.

pub mod client;

pub use client::DappClient;

use crate::error::ClaimError;
use crate::model::{AssetRecord, ChainId, ExecutionReceipt, UnlockData, WriteRequest};

/// Resolves the unlock proof recorded when the bundle was assembled.
pub trait EventLookup: Send + Sync {
    fn retrieve_assembly_event(
        &self,
        selection: &[AssetRecord],
        contract_address: &str,
    ) -> Result<UnlockData, ClaimError>;
}

/// Performs a contract write. `Ok` carries the validated receipt.
pub trait TransactionExecutor: Send + Sync {
    fn execute(&self, request: &WriteRequest) -> Result<ExecutionReceipt, ClaimError>;
}

/// Lists the bundles a wallet owns, for the picker.
pub trait NftInventory: Send + Sync {
    fn owned_bundles(
        &self,
        owner: &str,
        chain: ChainId,
        token_address: Option<&str>,
    ) -> Result<Vec<AssetRecord>, ClaimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}
