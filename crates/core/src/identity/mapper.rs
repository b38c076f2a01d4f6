//! Core identity virtualization logic.
//!
//! [`IdentityMapper`] resolves a physical card to a player identity,
//! preferring the local store's mapping and falling back to deterministic
//! virtual derivation for cards this server has never registered.

use std::sync::Arc;

use tracing::debug;

use super::VIRTUAL_PREFIX;
use crate::errors::{IdentityError, StoreError};
use crate::models::{CardId, UserId};
use crate::store::LocalStore;

/// Forward derivation: the virtual identity for a card.
///
/// Total and deterministic. Injective because card ids are canonicalized to
/// uppercase before embedding and local identities never carry the reserved
/// prefix.
pub fn card_to_virtual(card: &CardId) -> UserId {
    UserId::from_raw(format!("{VIRTUAL_PREFIX}{card}"))
}

/// Whether an identity is card-derived rather than store-owned.
///
/// Pure predicate; virtual identities are self-describing by construction,
/// so no store lookup is needed.
pub fn is_virtual(user: &UserId) -> bool {
    user.as_str().starts_with(VIRTUAL_PREFIX)
}

/// Inverse derivation: the card a virtual identity was derived from.
///
/// Defined only for virtual identities. Calling it on a store-owned
/// identity is a programming error and fails loudly.
pub fn virtual_to_card(user: &UserId) -> Result<CardId, IdentityError> {
    match user.as_str().strip_prefix(VIRTUAL_PREFIX) {
        Some(card) => Ok(CardId::new(card)),
        None => Err(IdentityError::NotVirtual(user.to_string())),
    }
}

/// Bidirectional mapper between physical cards and player identities.
pub struct IdentityMapper {
    store: Arc<dyn LocalStore>,
}

impl IdentityMapper {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Resolve a card to an identity.
    ///
    /// Returns the local identity when the store has a mapping for the
    /// card, otherwise the derived virtual identity. Only a store failure
    /// can make this fall through as an error; a missing mapping cannot.
    pub async fn resolve_card(&self, card: &CardId) -> Result<UserId, StoreError> {
        if let Some(user) = self.store.user_from_card(card).await? {
            debug!(card = %card, user = %user, "card mapped to local identity");
            return Ok(user);
        }

        let user = card_to_virtual(card);
        debug!(card = %card, user = %user, "card resolved to virtual identity");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_derivation_is_stable_and_case_insensitive() {
        let a = card_to_virtual(&CardId::new("e004aabb"));
        let b = card_to_virtual(&CardId::new("E004AABB"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_derivation_is_injective() {
        let a = card_to_virtual(&CardId::new("E004AABB"));
        let b = card_to_virtual(&CardId::new("E004AABC"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip() {
        let card = CardId::new("E004AABB01");
        let user = card_to_virtual(&card);
        assert!(is_virtual(&user));
        assert_eq!(virtual_to_card(&user).unwrap(), card);
        assert_eq!(card_to_virtual(&virtual_to_card(&user).unwrap()), user);
    }

    #[test]
    fn test_local_identity_is_not_virtual() {
        let user = UserId::local("1042");
        assert!(!is_virtual(&user));
        assert!(matches!(
            virtual_to_card(&user),
            Err(IdentityError::NotVirtual(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_card_prefers_local_mapping() {
        let store = Arc::new(MemoryStore::new());
        let card = CardId::new("E004AABB");
        let local = UserId::local("7");
        store.add_card(card.clone(), local.clone()).await;

        let mapper = IdentityMapper::new(store);
        assert_eq!(mapper.resolve_card(&card).await.unwrap(), local);
    }

    #[tokio::test]
    async fn test_resolve_card_falls_back_to_virtual() {
        let store = Arc::new(MemoryStore::new());
        let mapper = IdentityMapper::new(store);

        let card = CardId::new("E004FFFF");
        let user = mapper.resolve_card(&card).await.unwrap();
        assert!(is_virtual(&user));
        assert_eq!(virtual_to_card(&user).unwrap(), card);
    }
}
