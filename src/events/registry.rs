//! Event signature registry.
//!
//! The indexer only understands the two ERC-20 events. Their Solidity
//! declarations go through Alloy's `sol!` macro, which hashes the canonical
//! signature strings at compile time, so the registry is a constant table
//! with no initialization step and nothing to tear down.

use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    /// ERC-20 token events.
    interface IERC20 {
        /// Emitted when `value` tokens move from `from` to `to`.
        event Transfer(address indexed from, address indexed to, uint256 value);

        /// Emitted when `owner` sets the allowance of `spender` to `value`.
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }
}

pub use IERC20::{Approval, Transfer};

/// The kinds of event the indexer decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `Transfer(address,address,uint256)`
    Transfer,
    /// `Approval(address,address,uint256)`
    Approval,
}

impl EventKind {
    /// Every registered kind, in registry order.
    pub const ALL: [Self; 2] = [Self::Transfer, Self::Approval];

    /// Short name, also used as the persisted `event_type`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transfer => "Transfer",
            Self::Approval => "Approval",
        }
    }

    /// Canonical textual signature the topic hash is derived from.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Transfer => Transfer::SIGNATURE,
            Self::Approval => Approval::SIGNATURE,
        }
    }

    /// Keccak-256 hash of [`Self::signature`], i.e. the expected `topics[0]`.
    #[must_use]
    pub const fn topic_hash(self) -> B256 {
        match self {
            Self::Transfer => Transfer::SIGNATURE_HASH,
            Self::Approval => Approval::SIGNATURE_HASH,
        }
    }

    /// Number of topics a well-formed log of this kind carries
    /// (signature plus indexed parameters).
    #[must_use]
    pub const fn topic_count(self) -> usize {
        match self {
            Self::Transfer | Self::Approval => 3,
        }
    }

    /// Length in bytes of the ABI-encoded non-indexed parameters.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Transfer | Self::Approval => 32,
        }
    }

    /// Looks up the event kind whose signature hash equals `topic`.
    #[must_use]
    pub fn from_topic(topic: &B256) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.topic_hash() == *topic)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature hashes of every registered event, for subscription filters.
#[must_use]
pub fn topic_hashes() -> Vec<B256> {
    EventKind::ALL.iter().map(|kind| kind.topic_hash()).collect()
}
