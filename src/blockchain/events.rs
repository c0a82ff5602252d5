//! Router contract events and their ABI decoding.
//!
//! Every log is decoded once into the closed [`RouterEvent`] variant set,
//! selected by its first topic, and matched exhaustively afterwards.

use super::fetcher::RawLog;
use crate::error::{BridgeError, Result};
use crate::utils::{bytes_to_address, decode_hex, keccak256};
use num_bigint::BigUint;

pub const LOCK_SIGNATURE: &str = "Lock(uint256,address,bytes,uint256,uint256)";
pub const UNLOCK_SIGNATURE: &str = "Unlock(uint256,bytes,address,uint256,address,uint256)";
pub const MINT_SIGNATURE: &str = "Mint(uint256,bytes,address,uint256,address)";
pub const BURN_SIGNATURE: &str = "Burn(uint256,address,uint256,bytes)";
pub const MEMBER_UPDATED_SIGNATURE: &str = "MemberUpdated(address,bool)";

// Asset moved from its native chain towards a wrapped representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    pub target_chain: u64,
    pub token: String,
    pub receiver: Vec<u8>,
    pub amount: BigUint,
    pub service_fee: BigUint,
}

// Native asset released on this chain after a burn elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockEvent {
    pub source_chain: u64,
    pub transaction_id: String,
    pub token: String,
    pub amount: BigUint,
    pub receiver: String,
    pub service_fee: BigUint,
}

// Wrapped asset minted on this chain after a lock elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEvent {
    pub source_chain: u64,
    pub transaction_id: String,
    pub token: String,
    pub amount: BigUint,
    pub receiver: String,
}

// Wrapped asset burned on this chain to return to its native chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnEvent {
    pub target_chain: u64,
    pub token: String,
    pub amount: BigUint,
    pub receiver: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberUpdatedEvent {
    pub member: String,
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    Lock(LockEvent),
    Unlock(UnlockEvent),
    Mint(MintEvent),
    Burn(BurnEvent),
    MemberUpdated(MemberUpdatedEvent),
}

// Immutable log filter of one watcher, built once from the router ABI
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub addresses: Vec<String>,
    pub lock_hash: [u8; 32],
    pub unlock_hash: [u8; 32],
    pub mint_hash: [u8; 32],
    pub burn_hash: [u8; 32],
    pub member_updated_hash: [u8; 32],
    pub max_logs_blocks: u64,
}

impl FilterSpec {
    pub fn new(router_address: &str, max_logs_blocks: u64) -> Self {
        FilterSpec {
            addresses: vec![router_address.to_string()],
            lock_hash: keccak256(LOCK_SIGNATURE.as_bytes()),
            unlock_hash: keccak256(UNLOCK_SIGNATURE.as_bytes()),
            mint_hash: keccak256(MINT_SIGNATURE.as_bytes()),
            burn_hash: keccak256(BURN_SIGNATURE.as_bytes()),
            member_updated_hash: keccak256(MEMBER_UPDATED_SIGNATURE.as_bytes()),
            max_logs_blocks,
        }
    }

    // Topic-0 alternatives sent with eth_getLogs
    pub fn topics(&self) -> Vec<String> {
        [
            self.mint_hash,
            self.burn_hash,
            self.lock_hash,
            self.unlock_hash,
            self.member_updated_hash,
        ]
        .iter()
        .map(|h| format!("0x{}", hex::encode(h)))
        .collect()
    }

    // Decodes a raw log into its router event by its first topic
    pub fn decode(&self, log: &RawLog) -> Result<RouterEvent> {
        let topic = log
            .topics
            .first()
            .ok_or_else(|| BridgeError::Decode("log has no topics".to_string()))?;
        let topic: [u8; 32] = decode_hex(topic)?
            .try_into()
            .map_err(|_| BridgeError::Decode(format!("topic [{}] is not 32 bytes", topic)))?;
        let data = AbiData::new(decode_hex(&log.data)?);

        if topic == self.lock_hash {
            Ok(RouterEvent::Lock(LockEvent {
                target_chain: data.uint64(0)?,
                token: data.address(1)?,
                receiver: data.bytes(2)?,
                amount: data.uint(3)?,
                service_fee: data.uint(4)?,
            }))
        } else if topic == self.unlock_hash {
            Ok(RouterEvent::Unlock(UnlockEvent {
                source_chain: data.uint64(0)?,
                transaction_id: String::from_utf8_lossy(&data.bytes(1)?).into_owned(),
                token: data.address(2)?,
                amount: data.uint(3)?,
                receiver: data.address(4)?,
                service_fee: data.uint(5)?,
            }))
        } else if topic == self.mint_hash {
            Ok(RouterEvent::Mint(MintEvent {
                source_chain: data.uint64(0)?,
                transaction_id: String::from_utf8_lossy(&data.bytes(1)?).into_owned(),
                token: data.address(2)?,
                amount: data.uint(3)?,
                receiver: data.address(4)?,
            }))
        } else if topic == self.burn_hash {
            Ok(RouterEvent::Burn(BurnEvent {
                target_chain: data.uint64(0)?,
                token: data.address(1)?,
                amount: data.uint(2)?,
                receiver: data.bytes(3)?,
            }))
        } else if topic == self.member_updated_hash {
            Ok(RouterEvent::MemberUpdated(MemberUpdatedEvent {
                member: data.address(0)?,
                status: data.boolean(1)?,
            }))
        } else {
            Err(BridgeError::Decode(format!("unknown event topic [0x{}]", hex::encode(topic))))
        }
    }
}

// Head/tail ABI reader over non-indexed event data
pub(crate) struct AbiData {
    bytes: Vec<u8>,
}

impl AbiData {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        AbiData { bytes }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| {
                BridgeError::Decode(format!(
                    "data too short: need {} bytes at {}, have {}",
                    len,
                    offset,
                    self.bytes.len()
                ))
            })
    }

    fn word(&self, index: usize) -> Result<&[u8]> {
        self.slice(index * 32, 32)
    }

    pub(crate) fn uint(&self, index: usize) -> Result<BigUint> {
        Ok(BigUint::from_bytes_be(self.word(index)?))
    }

    pub(crate) fn uint64(&self, index: usize) -> Result<u64> {
        word_to_u64(self.word(index)?)
    }

    pub(crate) fn address(&self, index: usize) -> Result<String> {
        Ok(bytes_to_address(&self.word(index)?[12..]))
    }

    fn boolean(&self, index: usize) -> Result<bool> {
        Ok(word_to_u64(self.word(index)?)? != 0)
    }

    fn bytes(&self, index: usize) -> Result<Vec<u8>> {
        let offset = word_to_usize(self.word(index)?)?;
        let len = word_to_usize(self.slice(offset, 32)?)?;
        Ok(self.slice(offset + 32, len)?.to_vec())
    }
}

fn word_to_u64(word: &[u8]) -> Result<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(BridgeError::Decode(format!("value 0x{} overflows u64", hex::encode(word))));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

fn word_to_usize(word: &[u8]) -> Result<usize> {
    usize::try_from(word_to_u64(word)?).map_err(|e| BridgeError::Decode(e.to_string()))
}
