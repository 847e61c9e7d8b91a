//! Validated transaction requests for the token blocks.

use crate::U256;
use crate::error::{BlueprintError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// approve(address,uint256)
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
// transfer(address,uint256)
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// 20-byte account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Accepts exactly `0x` followed by 40 hex digits.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.len() != 42 || !trimmed.starts_with("0x") {
            return Err(BlueprintError::InvalidAddress(input.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&trimmed[2..], &mut bytes)
            .map_err(|_| BlueprintError::InvalidAddress(input.to_string()))?;
        Ok(Address(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = BlueprintError;
    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Parses a wei amount: decimal digits only, greater than zero.
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BlueprintError::InvalidAmount(input.to_string()));
    }
    let amount = U256::from_dec_str(trimmed)
        .map_err(|_| BlueprintError::InvalidAmount(input.to_string()))?;
    if amount.is_zero() {
        return Err(BlueprintError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Transfer {
        token: Address,
        to: Address,
        amount: U256,
    },
    NativeTransfer {
        to: Address,
        amount: U256,
    },
}

impl Operation {
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Approve { .. } => "approve",
            Operation::Transfer { .. } => "transfer",
            Operation::NativeTransfer { .. } => "native-transfer",
        }
    }
}

/// The `{to, data, value}` triple handed to a wallet.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub to: String,
    pub data: String,
    pub value: String,
}

pub fn build_request(operation: &Operation) -> TxRequest {
    match operation {
        Operation::Approve {
            token,
            spender,
            amount,
        } => TxRequest {
            to: token.to_string(),
            data: encode_call(APPROVE_SELECTOR, spender, *amount),
            value: "0".to_string(),
        },
        Operation::Transfer { token, to, amount } => TxRequest {
            to: token.to_string(),
            data: encode_call(TRANSFER_SELECTOR, to, *amount),
            value: "0".to_string(),
        },
        Operation::NativeTransfer { to, amount } => TxRequest {
            to: to.to_string(),
            data: "0x".to_string(),
            value: amount.to_string(),
        },
    }
}

// selector ++ address word ++ uint256 word
fn encode_call(selector: [u8; 4], address: &Address, amount: U256) -> String {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&selector);
    calldata.extend_from_slice(&[0u8; 12]);
    calldata.extend_from_slice(address.as_bytes());
    let mut word = [0u8; 32];
    for (index, byte) in word.iter_mut().rev().enumerate() {
        *byte = amount.byte(index);
    }
    calldata.extend_from_slice(&word);
    format!("0x{}", hex::encode(calldata))
}
