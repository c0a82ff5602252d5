use super::events::AbiData;
use super::fetcher::EvmRpcClient;
use crate::error::Result;
use crate::utils::keccak256;
use async_trait::async_trait;
use log::info;
use std::sync::{Arc, RwLock};

// Source of the router's validator member set
#[async_trait]
pub trait MemberRegistry: Send + Sync {
    // Re-reads the member set from its source of truth
    async fn reload_members(&self) -> Result<()>;
    fn members(&self) -> Vec<String>;
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

// Router contract view over JSON-RPC
pub struct RouterContract {
    client: Arc<EvmRpcClient>,
    address: String,
    members: RwLock<Vec<String>>,
}

impl RouterContract {
    pub fn new(client: Arc<EvmRpcClient>, address: &str) -> Self {
        RouterContract {
            client,
            address: address.to_string(),
            members: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MemberRegistry for RouterContract {
    async fn reload_members(&self) -> Result<()> {
        let count_data = self
            .client
            .call_contract(&self.address, &selector("membersCount()"))
            .await?;
        let count = AbiData::new(count_data).uint64(0)?;

        let member_at = selector("memberAt(uint256)");
        let mut members = Vec::new();
        for index in 0..count {
            let mut call = member_at.to_vec();
            let mut word = [0u8; 32];
            word[24..].copy_from_slice(&index.to_be_bytes());
            call.extend_from_slice(&word);

            let data = self.client.call_contract(&self.address, &call).await?;
            members.push(AbiData::new(data).address(0)?);
        }

        info!("Router [{}] members reloaded: {:?}", self.address, members);
        // Poisoning is ignored, the whole set is replaced
        let mut guard = self.members.write().unwrap_or_else(|e| e.into_inner());
        *guard = members;
        Ok(())
    }

    fn members(&self) -> Vec<String> {
        self.members.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
