//! Shelley address decoding
//!
//! Splits a bech32 address into its payment and stake credentials and derives
//! the canonical enterprise (payment-only) and reward (stake) addresses used
//! for exclusion checks and per-stake consolidation.
//!
//! Header byte layout (CIP-19):
//! - high nibble: address type
//!   - `0..=3` base address, bit 4 = payment script, bit 5 = stake script
//!   - `4..=5` pointer address (stake credential is a chain pointer, not decoded)
//!   - `6..=7` enterprise address (payment only)
//!   - `14..=15` reward address (stake only)
//!   - `8` Byron bootstrap (rejected)
//! - low nibble: network id (1 = mainnet)

use super::error::{Result, SnapshotError};
use bech32::{Bech32, Hrp};
use std::fmt;

/// Slot, transaction index and output index, one byte each at minimum
const POINTER_MIN_LEN: usize = 3;

/// Length of a blake2b-224 credential hash
pub const CREDENTIAL_HASH_LEN: usize = 28;

pub const MAINNET_NETWORK_ID: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    Key(Vec<u8>),
    Script(Vec<u8>),
}

impl Credential {
    pub fn hash(&self) -> &[u8] {
        match self {
            Credential::Key(hash) | Credential::Script(hash) => hash,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(hash) => write!(f, "key:{}", hex::encode(hash)),
            Credential::Script(hash) => write!(f, "script:{}", hex::encode(hash)),
        }
    }
}

/// Credentials extracted from one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDetails {
    pub network_id: u8,
    pub payment: Option<Credential>,
    pub stake: Option<Credential>,
}

/// Decodes chain addresses into credentials and back
pub trait AddressDecoder: Send + Sync {
    fn decode(&self, address: &str) -> Result<AddressDetails>;

    /// Canonical payment-only address for a payment credential
    fn payment_address(&self, network_id: u8, credential: &Credential) -> Result<String>;

    /// Canonical reward (stake) address for a stake credential
    fn reward_address(&self, network_id: u8, credential: &Credential) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct CardanoAddressDecoder;

impl CardanoAddressDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a base address holding both credentials
    pub fn base_address(
        &self,
        network_id: u8,
        payment: &Credential,
        stake: &Credential,
    ) -> Result<String> {
        let mut address_type = 0u8;
        if payment.is_script() {
            address_type |= 0b0001;
        }
        if stake.is_script() {
            address_type |= 0b0010;
        }

        let mut payload = Vec::with_capacity(1 + 2 * CREDENTIAL_HASH_LEN);
        payload.push(header(address_type, network_id));
        payload.extend_from_slice(payment.hash());
        payload.extend_from_slice(stake.hash());

        encode(payment_hrp(network_id), &payload)
    }
}

impl AddressDecoder for CardanoAddressDecoder {
    fn decode(&self, address: &str) -> Result<AddressDetails> {
        let malformed = |reason: String| SnapshotError::MalformedAddress {
            address: address.to_string(),
            reason,
        };

        let (_hrp, bytes) = bech32::decode(address).map_err(|e| malformed(e.to_string()))?;

        let (&head, body) = bytes
            .split_first()
            .ok_or_else(|| malformed("empty payload".to_string()))?;
        let address_type = head >> 4;
        let network_id = head & 0x0f;

        let take_hash = |offset: usize| -> Result<Vec<u8>> {
            body.get(offset..offset + CREDENTIAL_HASH_LEN)
                .map(|hash| hash.to_vec())
                .ok_or_else(|| {
                    malformed(format!(
                        "payload too short for address type {} ({} bytes)",
                        address_type,
                        body.len()
                    ))
                })
        };

        let credential = |hash: Vec<u8>, script: bool| {
            if script {
                Credential::Script(hash)
            } else {
                Credential::Key(hash)
            }
        };

        let (payment, stake) = match address_type {
            0..=3 => {
                if body.len() != 2 * CREDENTIAL_HASH_LEN {
                    return Err(malformed(format!(
                        "base address payload must be {} bytes, got {}",
                        2 * CREDENTIAL_HASH_LEN,
                        body.len()
                    )));
                }
                (
                    Some(credential(take_hash(0)?, address_type & 0b0001 != 0)),
                    Some(credential(
                        take_hash(CREDENTIAL_HASH_LEN)?,
                        address_type & 0b0010 != 0,
                    )),
                )
            }
            4 | 5 => {
                // payment hash followed by three variable-length pointer fields
                if body.len() < CREDENTIAL_HASH_LEN + POINTER_MIN_LEN {
                    return Err(malformed(format!(
                        "pointer address payload must be at least {} bytes, got {}",
                        CREDENTIAL_HASH_LEN + POINTER_MIN_LEN,
                        body.len()
                    )));
                }
                (Some(credential(take_hash(0)?, address_type == 5)), None)
            }
            6 | 7 => {
                if body.len() != CREDENTIAL_HASH_LEN {
                    return Err(malformed(format!(
                        "enterprise address payload must be {} bytes, got {}",
                        CREDENTIAL_HASH_LEN,
                        body.len()
                    )));
                }
                (Some(credential(take_hash(0)?, address_type == 7)), None)
            }
            14 | 15 => {
                if body.len() != CREDENTIAL_HASH_LEN {
                    return Err(malformed(format!(
                        "reward address payload must be {} bytes, got {}",
                        CREDENTIAL_HASH_LEN,
                        body.len()
                    )));
                }
                (None, Some(credential(take_hash(0)?, address_type == 15)))
            }
            8 => return Err(malformed("Byron addresses are not supported".to_string())),
            other => return Err(malformed(format!("unknown address type {}", other))),
        };

        Ok(AddressDetails {
            network_id,
            payment,
            stake,
        })
    }

    fn payment_address(&self, network_id: u8, credential: &Credential) -> Result<String> {
        let address_type = if credential.is_script() { 7 } else { 6 };
        let mut payload = Vec::with_capacity(1 + CREDENTIAL_HASH_LEN);
        payload.push(header(address_type, network_id));
        payload.extend_from_slice(credential.hash());
        encode(payment_hrp(network_id), &payload)
    }

    fn reward_address(&self, network_id: u8, credential: &Credential) -> Result<String> {
        let address_type = if credential.is_script() { 15 } else { 14 };
        let mut payload = Vec::with_capacity(1 + CREDENTIAL_HASH_LEN);
        payload.push(header(address_type, network_id));
        payload.extend_from_slice(credential.hash());
        encode(reward_hrp(network_id), &payload)
    }
}

fn header(address_type: u8, network_id: u8) -> u8 {
    (address_type << 4) | (network_id & 0x0f)
}

fn payment_hrp(network_id: u8) -> &'static str {
    if network_id == MAINNET_NETWORK_ID {
        "addr"
    } else {
        "addr_test"
    }
}

fn reward_hrp(network_id: u8) -> &'static str {
    if network_id == MAINNET_NETWORK_ID {
        "stake"
    } else {
        "stake_test"
    }
}

fn encode(hrp: &str, payload: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(hrp).map_err(|e| SnapshotError::MalformedAddress {
        address: hex::encode(payload),
        reason: e.to_string(),
    })?;
    bech32::encode::<Bech32>(hrp, payload).map_err(|e| SnapshotError::MalformedAddress {
        address: hex::encode(payload),
        reason: e.to_string(),
    })
}
