use crate::error::{BridgeError, Result};
use sha3::{Digest, Keccak256};

// Computes the keccak256 digest of the given bytes
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

// Decodes a hex string with or without the 0x prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| BridgeError::Decode(format!("invalid hex [{}]: {}", value, e)))
}

// Parses a JSON-RPC quantity (0x-prefixed hex) into a u64
pub fn parse_quantity(value: &str) -> Result<u64> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    if stripped.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(stripped, 16)
        .map_err(|e| BridgeError::Decode(format!("invalid quantity [{}]: {}", value, e)))
}

// Formats a u64 as a JSON-RPC quantity
pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

// Renders a 20-byte address in EIP-55 mixed-case form
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

// Interprets arbitrary bytes as an EVM address, keeping the trailing 20 bytes
pub fn bytes_to_address(bytes: &[u8]) -> String {
    let mut address = [0u8; 20];
    if bytes.len() >= 20 {
        address.copy_from_slice(&bytes[bytes.len() - 20..]);
    } else {
        address[20 - bytes.len()..].copy_from_slice(bytes);
    }
    to_checksum_address(&address)
}

// Reads one protobuf varint starting at `pos`, advancing it
fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| BridgeError::Decode("truncated varint".to_string()))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(BridgeError::Decode("varint overflow".to_string()))
}

// Decodes a protobuf-serialized settlement chain AccountID into `shard.realm.num`
pub fn decode_account_id(bytes: &[u8]) -> Result<String> {
    let (mut shard, mut realm, mut num) = (0u64, 0u64, 0u64);
    let mut pos = 0;
    while pos < bytes.len() {
        let key = read_varint(bytes, &mut pos)?;
        let (field, wire_type) = (key >> 3, key & 0x07);
        if wire_type != 0 {
            return Err(BridgeError::Decode(format!(
                "unsupported wire type {} for field {}",
                wire_type, field
            )));
        }
        let value = read_varint(bytes, &mut pos)?;
        match field {
            1 => shard = value,
            2 => realm = value,
            3 => num = value,
            _ => return Err(BridgeError::Decode(format!("unknown AccountID field {}", field))),
        }
    }
    Ok(format!("{}.{}.{}", shard, realm, num))
}

// Builds the progress-store key for a watcher: `<chain-id>-<contract-address>`
pub fn watcher_identity(chain_id: u64, contract_address: &str) -> String {
    format!("{}-{}", chain_id, contract_address)
}
