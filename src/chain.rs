//! Supported networks and their consensus constants.
//!
//! # Responsibilities
//! - Enumerate the supported chains (Steem, Hive, test network)
//! - Carry each network's chain id, default JSON-RPC endpoint, and
//!   expiration window
//! - Map operation kinds to the numeric ids used by the wire encoding

use serde::{Deserialize, Serialize};

use crate::tx::operation::OperationKind;

/// Seconds added to the reference block's timestamp to form a derived
/// transaction expiration.
pub const EXPIRE_IN_SECS: i64 = 600;

const STEEM_CHAIN_ID: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const HIVE_CHAIN_ID: &str = "beeab0de00000000000000000000000000000000000000000000000000000000";
const TEST_CHAIN_ID: &str = "18dcf0a285365fc58b71f18b3d3fec954aa0c141c44e4e5cb4cf777b9eab274e";

/// A supported network.
///
/// Each variant carries the constants the transaction lifecycle needs, so
/// chain selection is a closed type rather than runtime string dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Steem,
    #[default]
    Hive,
    Test,
}

impl Chain {
    /// The 32-byte chain id as a 64-character hex string.
    pub fn chain_id(self) -> &'static str {
        match self {
            Chain::Steem => STEEM_CHAIN_ID,
            Chain::Hive => HIVE_CHAIN_ID,
            Chain::Test => TEST_CHAIN_ID,
        }
    }

    /// Default JSON-RPC endpoint for this network.
    pub fn default_node(self) -> &'static str {
        match self {
            Chain::Steem => "https://api.steemit.com",
            Chain::Hive => "https://api.openhive.network",
            Chain::Test => "https://testnet.steemitdev.com",
        }
    }

    /// Whether a chain id belongs to one of the supported networks.
    pub fn known_chain_id(chain_id: &str) -> bool {
        [STEEM_CHAIN_ID, HIVE_CHAIN_ID, TEST_CHAIN_ID]
            .iter()
            .any(|known| chain_id.eq_ignore_ascii_case(known))
    }

    /// Numeric operation id used by this network's wire encoding.
    ///
    /// Steem and Hive share the condenser numbering; the test network
    /// mirrors Hive.
    pub fn operation_id(self, kind: OperationKind) -> u8 {
        match kind {
            OperationKind::Vote => 0,
            OperationKind::Comment => 1,
            OperationKind::Transfer => 2,
            OperationKind::CustomJson => 18,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Chain::Steem => "steem",
            Chain::Hive => "hive",
            Chain::Test => "test",
        };
        f.write_str(name)
    }
}
