//! Remote peer seam.
//!
//! Each sibling server in the federation is reachable through the
//! [`PeerClient`] trait: one query, one flat list of raw profile records.
//! [`HttpPeer`] is the shipped REST transport; the engine itself never
//! assumes anything beyond the trait.

pub mod http;

use async_trait::async_trait;

use crate::errors::PeerError;
use crate::models::{CardId, GameId, RawProfile};

/// Which identities a peer query asks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFilter {
    /// Profiles whose card list intersects the given cards.
    Cards(Vec<CardId>),
    /// Every profile the peer has for the game/version, no filter.
    All,
}

impl ProfileFilter {
    /// Wire name of the id type this filter selects.
    pub fn id_type(&self) -> &'static str {
        match self {
            Self::Cards(_) => "card",
            Self::All => "server",
        }
    }

    /// The card list, empty for [`ProfileFilter::All`].
    pub fn ids(&self) -> &[CardId] {
        match self {
            Self::Cards(cards) => cards,
            Self::All => &[],
        }
    }
}

/// A single remote peer server.
///
/// Implementations report profiles for the requested game/version; records
/// may carry a `cards` list and a `match` quality marker, which the engine
/// strips before normalization. Record order within one response must be
/// preserved by implementations -- the merge rules depend on it.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Configured peer name, used for ordering diagnostics and logging.
    fn name(&self) -> &str;

    /// Query this peer for profiles.
    async fn get_profiles(
        &self,
        game: GameId,
        version: u32,
        filter: &ProfileFilter,
    ) -> Result<Vec<RawProfile>, PeerError>;
}

pub use http::HttpPeer;
