//! Local profile store seam.
//!
//! The engine never talks to a database directly; it consumes the
//! [`LocalStore`] trait and leaves schema and persistence to the host.
//! [`MemoryStore`] is a complete in-memory implementation used by the test
//! suite and by embedders that do not need durable storage.

pub mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{CanonicalProfile, CardId, ExtId, GameId, RefId, UserId};

/// Interface to the locally-owned profile store.
///
/// Implementations must uphold two contracts the engine relies on:
///
/// - [`ref_id`](Self::ref_id) and [`ext_id`](Self::ext_id) mint-or-fetch and
///   must succeed for any identity, including virtual ones -- remote-derived
///   profiles get locally-minted ids attached too.
/// - Minted [`UserId`]s must never start with the reserved
///   [`VIRTUAL_PREFIX`](crate::identity::VIRTUAL_PREFIX); identity
///   virtualization depends on that namespace staying free.
///
/// Absent records are `None`, not errors; an `Err` always means the store
/// itself failed and is surfaced to the caller unchanged.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Stable reference id for (game, version, identity), minted on first
    /// use.
    async fn ref_id(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<RefId, StoreError>;

    /// Stable external id for (game, version, identity), minted on first
    /// use.
    async fn ext_id(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<ExtId, StoreError>;

    /// The profile stored for exactly this game/version, if any.
    async fn profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, StoreError>;

    /// The best available profile for this game, preferring the requested
    /// version.
    async fn any_profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, StoreError>;

    /// Batch form of [`any_profile`](Self::any_profile): one tuple per
    /// requested identity, in the store's own order, `None` where no
    /// profile exists.
    async fn any_profiles(
        &self,
        game: GameId,
        version: u32,
        users: &[UserId],
    ) -> Result<Vec<(UserId, Option<CanonicalProfile>)>, StoreError>;

    /// Every registered card with its owning identity.
    async fn all_cards(&self) -> Result<Vec<(CardId, UserId)>, StoreError>;

    /// Every stored profile for this game/version.
    async fn all_profiles(
        &self,
        game: GameId,
        version: u32,
    ) -> Result<Vec<(UserId, CanonicalProfile)>, StoreError>;

    /// The local identity a card is registered to, if any.
    async fn user_from_card(&self, card: &CardId) -> Result<Option<UserId>, StoreError>;

    /// The identity a reference id was minted for, if any.
    async fn user_from_ref_id(
        &self,
        game: GameId,
        version: u32,
        ref_id: &RefId,
    ) -> Result<Option<UserId>, StoreError>;

    /// The identity an external id was minted for, if any.
    async fn user_from_ext_id(
        &self,
        game: GameId,
        version: u32,
        ext_id: ExtId,
    ) -> Result<Option<UserId>, StoreError>;
}

pub use memory::MemoryStore;
