//! ERC-20 event model and decoding.
//!
//! - [`registry`]: signature hashes for the known events
//! - [`decoder`]: [`RawLog`] to [`DecodedEvent`] conversion
//!
//! # Example
//!
//! ```
//! use alloy::primitives::{address, Bytes, B256, U256};
//! use erc20_log_indexer::events::{decode, registry::EventKind, RawLog};
//!
//! let from = address!("1111111111111111111111111111111111111111");
//! let to = address!("2222222222222222222222222222222222222222");
//! let raw = RawLog {
//!     address: address!("1234567890abcdef1234567890abcdef12345678"),
//!     topics: vec![EventKind::Transfer.topic_hash(), from.into_word(), to.into_word()],
//!     data: Bytes::from(U256::from(1000).to_be_bytes::<32>().to_vec()),
//!     block_number: 1,
//!     tx_hash: B256::ZERO,
//!     log_index: 0,
//! };
//!
//! let event = decode(&raw).unwrap();
//! assert_eq!(event.value(), U256::from(1000));
//! ```

use alloy::primitives::{Address, Bytes, B256, U256};

use crate::sink::EventRecord;

pub mod decoder;
pub mod registry;

pub use decoder::decode;
pub use registry::{topic_hashes, EventKind};

/// A log record as delivered by the node, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract
    pub address: Address,
    /// `topics[0]` is the signature hash, the rest are indexed parameters
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed parameters
    pub data: Bytes,
    /// Block containing the log
    pub block_number: u64,
    /// Transaction that emitted the log
    pub tx_hash: B256,
    /// Position of the log within its block
    pub log_index: u64,
}

/// Pending logs have no block, hash or index yet; those fields default to zero.
impl From<alloy::rpc::types::Log> for RawLog {
    fn from(log: alloy::rpc::types::Log) -> Self {
        Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            block_number: log.block_number.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.unwrap_or_default(),
        }
    }
}

/// A successfully decoded ERC-20 event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Token transfer
    Transfer {
        /// Sender
        from: Address,
        /// Recipient
        to: Address,
        /// Amount transferred
        value: U256,
        /// Block containing the log
        block_number: u64,
        /// Emitting transaction
        tx_hash: B256,
        /// Position of the log within its block
        log_index: u64,
    },
    /// Allowance change
    Approval {
        /// Token holder
        owner: Address,
        /// Approved spender
        spender: Address,
        /// New allowance
        value: U256,
        /// Block containing the log
        block_number: u64,
        /// Emitting transaction
        tx_hash: B256,
        /// Position of the log within its block
        log_index: u64,
    },
}

impl DecodedEvent {
    /// Which registered event this is.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Transfer { .. } => EventKind::Transfer,
            Self::Approval { .. } => EventKind::Approval,
        }
    }

    /// The token amount carried by the event.
    #[must_use]
    pub const fn value(&self) -> U256 {
        match self {
            Self::Transfer { value, .. } | Self::Approval { value, .. } => *value,
        }
    }

    /// `(from, to)` for transfers, `(owner, spender)` for approvals.
    #[must_use]
    pub const fn parties(&self) -> (Address, Address) {
        match self {
            Self::Transfer { from, to, .. } => (*from, *to),
            Self::Approval { owner, spender, .. } => (*owner, *spender),
        }
    }

    /// Block the event was emitted in.
    #[must_use]
    pub const fn block_number(&self) -> u64 {
        match self {
            Self::Transfer { block_number, .. } | Self::Approval { block_number, .. } => {
                *block_number
            }
        }
    }

    /// Transaction that emitted the event.
    #[must_use]
    pub const fn tx_hash(&self) -> B256 {
        match self {
            Self::Transfer { tx_hash, .. } | Self::Approval { tx_hash, .. } => *tx_hash,
        }
    }

    /// Flattens the event into the sink's record shape.
    ///
    /// Exactly one of the `(from, to)` and `(owner, spender)` pairs is set.
    #[must_use]
    pub fn to_record(&self) -> EventRecord {
        let (first, second) = self.parties();
        let (first, second) = (Some(hex_address(&first)), Some(hex_address(&second)));

        let (from, to, owner, spender) = match self.kind() {
            EventKind::Transfer => (first, second, None, None),
            EventKind::Approval => (None, None, first, second),
        };

        let log_index = match self {
            Self::Transfer { log_index, .. } | Self::Approval { log_index, .. } => *log_index,
        };

        EventRecord {
            block_number: self.block_number(),
            tx_hash: alloy::primitives::hex::encode_prefixed(self.tx_hash().as_slice()),
            log_index,
            event_type: self.kind().name().to_string(),
            from,
            to,
            owner,
            spender,
            value: self.value(),
        }
    }
}

/// Lowercase `0x`-prefixed rendering of an address.
#[must_use]
pub fn hex_address(address: &Address) -> String {
    alloy::primitives::hex::encode_prefixed(address.as_slice())
}
