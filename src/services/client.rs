use std::time::Duration;

use bevy::log::{error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::DappSettings;
use crate::error::ClaimError;
use crate::model::{
    AssemblyEventResponse, AssetRecord, ChainId, ExecutionReceipt, TransactionResponse, UnlockData,
    WriteRequest,
};
use crate::networks::same_address;
use crate::services::{EventLookup, NftInventory, TransactionExecutor};

#[derive(Debug, Serialize, Deserialize)]
pub struct AssemblyEventRequest {
    #[serde(rename = "tokenId")]
    pub token_id: String,
    #[serde(rename = "tokenAddress")]
    pub token_address: String,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NftListResponse {
    Paged { result: Vec<AssetRecord> },
    Plain(Vec<AssetRecord>),
}

impl From<NftListResponse> for Vec<AssetRecord> {
    fn from(response: NftListResponse) -> Self {
        match response {
            NftListResponse::Paged { result } => result,
            NftListResponse::Plain(records) => records,
        }
    }
}

/// Backoff before retry `attempt` (0-based): `base_ms`, doubled per attempt, saturating.
pub fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
}

fn network_error(e: reqwest::Error, what: &str) -> ClaimError {
    if e.is_timeout() {
        ClaimError::Network(format!("{} request timeout", what))
    } else if e.is_connect() {
        ClaimError::Network(format!("Connection failed: {}", e))
    } else {
        ClaimError::Network(e.to_string())
    }
}

/// HTTP client for the indexer (events, inventory) and the transaction relay.
#[derive(Clone)]
pub struct DappClient {
    client: Client,
    chain: ChainId,
    pub settings: DappSettings,
}

impl DappClient {
    pub fn new(settings: &DappSettings) -> Result<Self, ClaimError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ClaimError::Network(format!("Failed to create HTTP client: {}", e)))?;
        let chain = settings.chain_id.parse()?;

        Ok(Self {
            client,
            chain,
            settings: settings.clone(),
        })
    }

    pub fn assembly_event_url(&self, contract_address: &str) -> String {
        let endpoint = self
            .settings
            .assembly_event_endpoint
            .replace("{chain}", &self.chain.to_string())
            .replace("{contract}", contract_address);
        format!("{}{}", self.settings.indexer_base_url, endpoint)
    }

    pub fn execute_url(&self) -> String {
        let endpoint = self.settings.execute_endpoint.replace("{chain}", &self.chain.to_string());
        format!("{}{}", self.settings.relay_base_url, endpoint)
    }

    pub fn nfts_url(&self, chain: ChainId, owner: &str) -> String {
        let endpoint = self
            .settings
            .nfts_endpoint
            .replace("{chain}", &chain.to_string())
            .replace("{owner}", owner);
        format!("{}{}", self.settings.indexer_base_url, endpoint)
    }

    async fn retry_request<F, Fut, T>(
        &self,
        operation: F,
        max_retries: u32,
    ) -> Result<T, ClaimError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClaimError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    // 1s, 2s, 4s by default
                    let delay_ms = backoff_delay_ms(self.settings.retry_base_delay_ms, attempt);
                    warn!(
                        "Request failed ({}), retrying in {}ms (attempt {}/{})",
                        e,
                        delay_ms,
                        attempt + 1,
                        max_retries + 1
                    );
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // Blocking wrapper: every call gets its own Tokio runtime
    fn run_with_tokio<F, R>(&self, future: F) -> Result<R, ClaimError>
    where
        F: std::future::Future<Output = Result<R, ClaimError>> + Send + 'static,
        R: Send + 'static,
    {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ClaimError::Network(format!("Failed to create Tokio runtime: {}", e)))?;
        rt.block_on(future)
    }

    pub async fn retrieve_assembly_event_async(
        &self,
        asset: AssetRecord,
        contract_address: String,
    ) -> Result<UnlockData, ClaimError> {
        let url = self.assembly_event_url(&contract_address);
        let request = AssemblyEventRequest {
            token_id: asset.token_id.clone(),
            token_address: asset.token_address.clone(),
            contract_address,
        };

        info!("🔍 Looking up assembly event for bundle {}", request.token_id);
        info!("📍 Request URL: {}", url);

        self.retry_request(
            || async {
                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| network_error(e, "Assembly event"))?;

                let status_code = response.status();
                let response_body = response.text().await.unwrap_or_default();

                info!("📡 AssemblyEvent Response Status: {}", status_code);

                if !status_code.is_success() {
                    return Err(ClaimError::Api(format!(
                        "Assembly event lookup failed with status {}: {}",
                        status_code, response_body
                    )));
                }

                let event: AssemblyEventResponse =
                    serde_json::from_str(&response_body).map_err(|e| {
                        ClaimError::Parse(format!("Failed to parse assembly event: {}", e))
                    })?;
                Ok(UnlockData::from(event))
            },
            self.settings.max_retries,
        )
        .await
    }

    /// Submits once; a failed write is never retried automatically.
    pub async fn execute_async(
        &self,
        request: WriteRequest,
    ) -> Result<ExecutionReceipt, ClaimError> {
        let url = self.execute_url();

        info!(
            "🔥 Submitting {} on {} for bundle {}",
            request.function_name, request.contract_address, request.params.token_id
        );
        info!("📍 Request URL: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClaimError::Execution(network_error(e, "Execute").to_string()))?;

        let status_code = response.status();
        let response_body = response.text().await.unwrap_or_default();

        info!("📡 Execute Response Status: {}", status_code);
        info!("📥 Response Body: {}", response_body);

        if !status_code.is_success() {
            error!("❌ Execution failed with status {}: {}", status_code, response_body);
            return Err(ClaimError::Execution(format!(
                "Relay returned status {}: {}",
                status_code, response_body
            )));
        }

        let parsed: TransactionResponse = serde_json::from_str(&response_body).map_err(|e| {
            ClaimError::MalformedResponse(format!("Relay body is not a transaction: {}", e))
        })?;
        ExecutionReceipt::try_from(parsed)
    }

    pub async fn owned_bundles_async(
        &self,
        owner: String,
        chain: ChainId,
        token_address: Option<String>,
    ) -> Result<Vec<AssetRecord>, ClaimError> {
        let url = self.nfts_url(chain, &owner);

        info!("🖼️ Fetching owned bundles for {}", owner);
        info!("📍 Request URL: {}", url);

        let records = self
            .retry_request(
                || async {
                    let mut builder = self.client.get(&url);
                    if let Some(address) = &token_address {
                        builder = builder.query(&[("token_addresses", address.as_str())]);
                    }
                    let response = builder.send().await.map_err(|e| network_error(e, "NFT list"))?;

                    let status_code = response.status();
                    let response_body = response.text().await.unwrap_or_default();

                    info!("📡 NFT list Response Status: {}", status_code);

                    if !status_code.is_success() {
                        return Err(ClaimError::Api(format!(
                            "NFT list failed with status {}: {}",
                            status_code, response_body
                        )));
                    }

                    let list: NftListResponse =
                        serde_json::from_str(&response_body).map_err(|e| {
                            ClaimError::Parse(format!("Failed to parse NFT list: {}", e))
                        })?;
                    Ok(Vec::<AssetRecord>::from(list))
                },
                self.settings.max_retries,
            )
            .await?;

        let bundles: Vec<AssetRecord> = match &token_address {
            Some(address) => records
                .into_iter()
                .filter(|record| same_address(&record.token_address, address))
                .collect(),
            None => records,
        };

        info!("🖼️ Found {} bundle(s)", bundles.len());
        Ok(bundles)
    }
}

impl EventLookup for DappClient {
    fn retrieve_assembly_event(
        &self,
        selection: &[AssetRecord],
        contract_address: &str,
    ) -> Result<UnlockData, ClaimError> {
        let asset = selection.first().cloned().ok_or(ClaimError::MissingBundle)?;
        let client = self.clone();
        let contract = contract_address.to_string();
        self.run_with_tokio(async move {
            client.retrieve_assembly_event_async(asset, contract).await
        })
    }
}

impl TransactionExecutor for DappClient {
    fn execute(&self, request: &WriteRequest) -> Result<ExecutionReceipt, ClaimError> {
        let client = self.clone();
        let request = request.clone();
        self.run_with_tokio(async move { client.execute_async(request).await })
    }
}

impl NftInventory for DappClient {
    fn owned_bundles(
        &self,
        owner: &str,
        chain: ChainId,
        token_address: Option<&str>,
    ) -> Result<Vec<AssetRecord>, ClaimError> {
        let client = self.clone();
        let owner = owner.to_string();
        let token_address = token_address.map(str::to_string);
        self.run_with_tokio(async move {
            client.owned_bundles_async(owner, chain, token_address).await
        })
    }
}
