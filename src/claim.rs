//! The bundle claim control: picker selection, typed bundle id and the
//! lookup-then-burn flow with its user notifications.
//!
//! The flow is split in three so the UI thread never blocks:
//! [`BundleClaim::begin_claim`] snapshots the state into a [`ClaimJob`],
//! [`ClaimJob::run`] performs the two external calls (on any thread), and
//! [`BundleClaim::finish_claim`] applies the result and notifies.

use std::sync::Arc;

use bevy::log::{error, info, warn};
use bevy::prelude::Resource;

use crate::abi::ContractAbi;
use crate::error::ClaimError;
use crate::model::{
    AssetRecord, BundleSelection, BurnParams, ChainId, ExecutionReceipt, UnlockData, WriteRequest,
};
use crate::networks::{ellipsis_text, same_address, transaction_link};
use crate::services::{
    EventLookup, Notification, NotificationLevel, NotificationSink, TransactionExecutor,
};

pub const CLAIMED_TITLE: &str = "Bundle claimed!";
pub const NOT_CLAIMABLE_TITLE: &str = "Bundle non-claimable";
pub const NOT_CLAIMABLE_MESSAGE: &str = "Oops, you can't claim this bundle at this time. \
    It is either unconfirmed yet, or already claimed.";
pub const UNEXPECTED_ERROR_TITLE: &str = "Unexpected error";
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "Oops, something went wrong while unpacking your bundle!";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Your unpack transaction was sent, \
    but its receipt could not be read. Check your wallet before retrying.";

/// Wallet and chain context the control works in.
#[derive(Debug, Clone)]
pub struct DappContext {
    pub wallet_address: String,
    pub chain_id: ChainId,
    pub abi: Arc<ContractAbi>,
    pub default_factory_address: String,
}

impl DappContext {
    pub fn new(
        wallet_address: impl Into<String>,
        chain_id: ChainId,
        abi_json: &str,
        default_factory_address: impl Into<String>,
    ) -> Result<Self, ClaimError> {
        Ok(Self {
            wallet_address: wallet_address.into(),
            chain_id,
            abi: Arc::new(ContractAbi::parse(abi_json)?),
            default_factory_address: default_factory_address.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPhase {
    Idle,
    PickerOpen,
    Claiming,
}

/// Result of running a [`ClaimJob`], classified by where it stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult {
    Claimed(ExecutionReceipt),
    /// Failed before anything was submitted.
    NotClaimable(ClaimError),
    /// The write was submitted and failed, or its response was unreadable.
    ExecutionFailed(ClaimError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed { token_id: String, link: Option<String> },
    NotClaimable,
    Failed,
}

/// Everything one claim attempt needs, detached from the control's state.
#[derive(Debug, Clone)]
pub struct ClaimJob {
    pub wallet_address: String,
    pub contract_address: String,
    pub selection: BundleSelection,
    abi: Arc<ContractAbi>,
}

impl ClaimJob {
    pub fn write_request(
        &self,
        asset: &AssetRecord,
        unlock: UnlockData,
    ) -> Result<WriteRequest, ClaimError> {
        self.abi.ensure_burn()?;

        Ok(WriteRequest {
            contract_address: self.contract_address.clone(),
            function_name: BurnParams::FUNCTION_NAME.to_string(),
            abi: Arc::clone(&self.abi),
            params: BurnParams::new(&self.wallet_address, &asset.token_id, unlock),
        })
    }

    /// Lookup, then write. A lookup failure never reaches the executor.
    pub fn run(self, lookup: &dyn EventLookup, executor: &dyn TransactionExecutor) -> ClaimResult {
        let Some(asset) = self.selection.first() else {
            warn!("Claim requested without a bundle");
            return ClaimResult::NotClaimable(ClaimError::MissingBundle);
        };

        let unlock = match lookup.retrieve_assembly_event(&self.selection, &self.contract_address) {
            Ok(unlock) => unlock,
            Err(e) => {
                error!("Assembly event lookup failed for bundle {}: {}", asset.token_id, e);
                return ClaimResult::NotClaimable(e);
            }
        };
        info!(
            "Unlock data for bundle {}: {} address(es), {} number(s)",
            asset.token_id,
            unlock.addresses.len(),
            unlock.numbers.len()
        );

        let request = match self.write_request(asset, unlock) {
            Ok(request) => request,
            Err(e) => {
                error!("Could not build burn request: {}", e);
                return ClaimResult::NotClaimable(e);
            }
        };

        match executor.execute(&request) {
            Ok(receipt) => ClaimResult::Claimed(receipt),
            Err(e) => {
                error!("Burn of bundle {} failed: {}", asset.token_id, e);
                ClaimResult::ExecutionFailed(e)
            }
        }
    }
}

#[derive(Resource, Debug)]
pub struct BundleClaim {
    context: DappContext,
    picker_visible: bool,
    confirm_loading: bool,
    inventory_pending: bool,
    claiming: bool,
    selected_bundle: BundleSelection,
    bundle_id: Option<String>,
}

impl BundleClaim {
    pub fn new(context: DappContext) -> Self {
        Self {
            context,
            picker_visible: false,
            confirm_loading: false,
            inventory_pending: false,
            claiming: false,
            selected_bundle: Vec::new(),
            bundle_id: None,
        }
    }

    pub fn context(&self) -> &DappContext {
        &self.context
    }

    pub fn phase(&self) -> ClaimPhase {
        if self.claiming {
            ClaimPhase::Claiming
        } else if self.picker_visible {
            ClaimPhase::PickerOpen
        } else {
            ClaimPhase::Idle
        }
    }

    pub fn is_picker_visible(&self) -> bool {
        self.picker_visible
    }

    pub fn is_confirm_loading(&self) -> bool {
        self.confirm_loading
    }

    pub fn is_claiming(&self) -> bool {
        self.claiming
    }

    pub fn selected_bundle(&self) -> &[AssetRecord] {
        &self.selected_bundle
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.bundle_id.as_deref()
    }

    pub fn open_picker(&mut self) {
        if self.claiming {
            warn!("Picker not opened: a claim is in flight");
            return;
        }
        self.picker_visible = true;
    }

    pub fn close_picker(&mut self) {
        self.picker_visible = false;
        self.confirm_loading = false;
    }

    /// Shows the picker as loading. Returns `true` when the caller should start
    /// fetching the owned bundles, `false` while an earlier fetch is still running.
    pub fn request_inventory(&mut self) -> bool {
        self.confirm_loading = true;
        if self.inventory_pending {
            return false;
        }
        self.inventory_pending = true;
        true
    }

    pub fn is_inventory_pending(&self) -> bool {
        self.inventory_pending
    }

    pub fn finish_inventory_load(&mut self) {
        self.inventory_pending = false;
        self.confirm_loading = false;
    }

    pub fn on_picker_confirm(&mut self, selection: BundleSelection) {
        self.bundle_id = Some(
            selection
                .first()
                .map(|asset| asset.token_id.clone())
                .unwrap_or_default(),
        );
        if let Some(asset) = selection.first() {
            info!("Bundle {} selected from {}", asset.token_id, asset.token_address);
        }
        self.selected_bundle = selection;
        self.picker_visible = false;
        self.confirm_loading = false;
    }

    pub fn set_identifier(&mut self, value: impl Into<String>) {
        self.bundle_id = Some(value.into());
    }

    /// The bundle's own contract when it is not the default factory, else the factory.
    pub fn resolve_contract_address(&self) -> String {
        let default_factory = &self.context.default_factory_address;
        match self.selected_bundle.first() {
            Some(asset) if !same_address(&asset.token_address, default_factory) => {
                asset.token_address.clone()
            }
            _ => default_factory.clone(),
        }
    }

    // A typed id stands in for the asset when nothing was picked.
    fn claim_target(&self) -> BundleSelection {
        if !self.selected_bundle.is_empty() {
            return self.selected_bundle.clone();
        }
        match self.bundle_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                vec![AssetRecord::new(id, self.context.default_factory_address.clone())]
            }
            _ => Vec::new(),
        }
    }

    pub fn begin_claim(&mut self) -> Result<ClaimJob, ClaimError> {
        if self.claiming || self.picker_visible {
            warn!("Claim ignored: {:?} in progress", self.phase());
            return Err(ClaimError::Busy);
        }

        let contract_address = self.resolve_contract_address();
        let job = ClaimJob {
            wallet_address: self.context.wallet_address.clone(),
            contract_address,
            selection: self.claim_target(),
            abi: Arc::clone(&self.context.abi),
        };
        self.claiming = true;

        info!(
            "Claim started for bundle {:?} on contract {}",
            job.selection.first().map(|asset| asset.token_id.as_str()),
            job.contract_address
        );
        Ok(job)
    }

    pub fn finish_claim(
        &mut self,
        result: ClaimResult,
        sink: &mut dyn NotificationSink,
    ) -> ClaimOutcome {
        self.claiming = false;

        match result {
            ClaimResult::Claimed(receipt) => {
                let link = transaction_link(self.context.chain_id, &receipt.transaction_hash);
                if link.is_none() {
                    warn!("No block explorer known for chain {}", self.context.chain_id);
                }
                let message = format!(
                    "Your bundle id: \"{}\" has been successfully unpacked!",
                    ellipsis_text(&receipt.token_id, 6)
                );
                sink.notify(
                    Notification::new(NotificationLevel::Success, CLAIMED_TITLE, message)
                        .with_link(link.clone()),
                );
                info!("Bundle {} claimed in tx {}", receipt.token_id, receipt.transaction_hash);

                self.bundle_id = None;
                self.selected_bundle.clear();
                ClaimOutcome::Claimed {
                    token_id: receipt.token_id,
                    link,
                }
            }
            ClaimResult::NotClaimable(e) => {
                warn!("Bundle not claimable: {}", e);
                sink.notify(Notification::new(
                    NotificationLevel::Error,
                    NOT_CLAIMABLE_TITLE,
                    NOT_CLAIMABLE_MESSAGE,
                ));
                ClaimOutcome::NotClaimable
            }
            ClaimResult::ExecutionFailed(e) => {
                let message = match &e {
                    ClaimError::MalformedResponse(_) => MALFORMED_RESPONSE_MESSAGE,
                    _ => UNEXPECTED_ERROR_MESSAGE,
                };
                error!("Unpack failed: {}", e);
                sink.notify(Notification::new(
                    NotificationLevel::Error,
                    UNEXPECTED_ERROR_TITLE,
                    message,
                ));
                ClaimOutcome::Failed
            }
        }
    }

    /// Runs the whole flow on the calling thread.
    pub fn claim_blocking(
        &mut self,
        lookup: &dyn EventLookup,
        executor: &dyn TransactionExecutor,
        sink: &mut dyn NotificationSink,
    ) -> Result<ClaimOutcome, ClaimError> {
        let job = self.begin_claim()?;
        let result = job.run(lookup, executor);
        Ok(self.finish_claim(result, sink))
    }

    /// Text under the input once something was picked.
    pub fn display_text(&self) -> Option<String> {
        if self.selected_bundle.is_empty() {
            return None;
        }
        Some(format!(
            "Bundles Id: {}",
            ellipsis_text(self.bundle_id.as_deref().unwrap_or_default(), 5)
        ))
    }
}
