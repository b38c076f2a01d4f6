//! In-memory [`LocalStore`] implementation.
//!
//! Backs the test suite and lightweight embeddings. Rows keep insertion
//! order so enumeration results are deterministic.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::LocalStore;
use crate::errors::StoreError;
use crate::models::{CanonicalProfile, CardId, ExtId, GameId, ProfileExtras, RefId, UserId};

#[derive(Debug, Clone)]
struct ProfileRow {
    game: GameId,
    version: u32,
    user: UserId,
    profile: CanonicalProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdKey {
    game: GameId,
    version: u32,
    user: UserId,
}

#[derive(Default)]
struct Inner {
    cards: Vec<(CardId, UserId)>,
    profiles: Vec<ProfileRow>,
    ref_ids: Vec<(IdKey, RefId)>,
    ext_ids: Vec<(IdKey, ExtId)>,
    next_ext_id: i64,
}

/// Thread-safe in-memory profile store.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_ext_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Register a card to a local identity.
    pub async fn add_card(&self, card: CardId, user: UserId) {
        let mut inner = self.inner.write().await;
        inner.cards.push((card, user));
    }

    /// Store a profile, minting ref/ext ids for it, and return the stored
    /// canonical value.
    pub async fn insert_profile(
        &self,
        game: GameId,
        version: u32,
        user: UserId,
        name: &str,
        extras: ProfileExtras,
    ) -> CanonicalProfile {
        let mut inner = self.inner.write().await;
        let ref_id = inner.mint_ref_id(game, version, &user);
        let ext_id = inner.mint_ext_id(game, version, &user);
        let profile = CanonicalProfile {
            name: name.to_string(),
            game,
            version,
            ref_id,
            ext_id,
            extras,
        };
        inner.profiles.push(ProfileRow {
            game,
            version,
            user,
            profile: profile.clone(),
        });
        profile
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn key(game: GameId, version: u32, user: &UserId) -> IdKey {
        IdKey {
            game,
            version,
            user: user.clone(),
        }
    }

    fn mint_ref_id(&mut self, game: GameId, version: u32, user: &UserId) -> RefId {
        let key = Self::key(game, version, user);
        if let Some((_, existing)) = self.ref_ids.iter().find(|(k, _)| *k == key) {
            return existing.clone();
        }
        let minted = RefId::new(format!("R{:08}", self.ref_ids.len() + 1));
        self.ref_ids.push((key, minted.clone()));
        minted
    }

    fn mint_ext_id(&mut self, game: GameId, version: u32, user: &UserId) -> ExtId {
        let key = Self::key(game, version, user);
        if let Some((_, existing)) = self.ext_ids.iter().find(|(k, _)| *k == key) {
            return *existing;
        }
        let minted = ExtId::new(self.next_ext_id);
        self.next_ext_id += 1;
        self.ext_ids.push((key, minted));
        minted
    }

    fn profile_for(&self, game: GameId, version: u32, user: &UserId) -> Option<CanonicalProfile> {
        self.profiles
            .iter()
            .find(|row| row.game == game && row.version == version && row.user == *user)
            .map(|row| row.profile.clone())
    }

    fn any_profile_for(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Option<CanonicalProfile> {
        if let Some(profile) = self.profile_for(game, version, user) {
            return Some(profile);
        }
        // Fall back to the newest version stored for this game.
        self.profiles
            .iter()
            .filter(|row| row.game == game && row.user == *user)
            .max_by_key(|row| row.version)
            .map(|row| row.profile.clone())
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn ref_id(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<RefId, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.mint_ref_id(game, version, user))
    }

    async fn ext_id(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<ExtId, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.mint_ext_id(game, version, user))
    }

    async fn profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profile_for(game, version, user))
    }

    async fn any_profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.any_profile_for(game, version, user))
    }

    async fn any_profiles(
        &self,
        game: GameId,
        version: u32,
        users: &[UserId],
    ) -> Result<Vec<(UserId, Option<CanonicalProfile>)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(users
            .iter()
            .map(|user| (user.clone(), inner.any_profile_for(game, version, user)))
            .collect())
    }

    async fn all_cards(&self) -> Result<Vec<(CardId, UserId)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.cards.clone())
    }

    async fn all_profiles(
        &self,
        game: GameId,
        version: u32,
    ) -> Result<Vec<(UserId, CanonicalProfile)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .profiles
            .iter()
            .filter(|row| row.game == game && row.version == version)
            .map(|row| (row.user.clone(), row.profile.clone()))
            .collect())
    }

    async fn user_from_card(&self, card: &CardId) -> Result<Option<UserId>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .cards
            .iter()
            .find(|(c, _)| c == card)
            .map(|(_, user)| user.clone()))
    }

    async fn user_from_ref_id(
        &self,
        game: GameId,
        version: u32,
        ref_id: &RefId,
    ) -> Result<Option<UserId>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ref_ids
            .iter()
            .find(|(key, id)| key.game == game && key.version == version && id == ref_id)
            .map(|(key, _)| key.user.clone()))
    }

    async fn user_from_ext_id(
        &self,
        game: GameId,
        version: u32,
        ext_id: ExtId,
    ) -> Result<Option<UserId>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ext_ids
            .iter()
            .find(|(key, id)| key.game == game && key.version == version && *id == ext_id)
            .map(|(key, _)| key.user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ref_and_ext_ids_are_stable() {
        let store = MemoryStore::new();
        let user = UserId::local("42");

        let r1 = store.ref_id(GameId::GrooveCoast, 2, &user).await.unwrap();
        let r2 = store.ref_id(GameId::GrooveCoast, 2, &user).await.unwrap();
        assert_eq!(r1, r2);

        let e1 = store.ext_id(GameId::GrooveCoast, 2, &user).await.unwrap();
        let e2 = store.ext_id(GameId::GrooveCoast, 2, &user).await.unwrap();
        assert_eq!(e1, e2);

        // A different version mints different ids.
        let r3 = store.ref_id(GameId::GrooveCoast, 3, &user).await.unwrap();
        assert_ne!(r1, r3);
    }

    #[tokio::test]
    async fn test_ids_minted_for_virtual_identities() {
        let store = MemoryStore::new();
        let user = crate::identity::card_to_virtual(&CardId::new("E004AA"));
        let ref_id = store.ref_id(GameId::DanceStage, 5, &user).await.unwrap();
        assert_eq!(
            store
                .user_from_ref_id(GameId::DanceStage, 5, &ref_id)
                .await
                .unwrap(),
            Some(user)
        );
    }

    #[tokio::test]
    async fn test_any_profile_falls_back_to_newest_version() {
        let store = MemoryStore::new();
        let user = UserId::local("9");
        store
            .insert_profile(GameId::PopCarnival, 3, user.clone(), "OLD", Default::default())
            .await;
        let newer = store
            .insert_profile(GameId::PopCarnival, 4, user.clone(), "NEW", Default::default())
            .await;

        // No version-6 profile stored; the newest one is returned.
        let got = store
            .any_profile(GameId::PopCarnival, 6, &user)
            .await
            .unwrap();
        assert_eq!(got, Some(newer));

        assert_eq!(store.profile(GameId::PopCarnival, 6, &user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_any_profiles_preserves_request_order() {
        let store = MemoryStore::new();
        let a = UserId::local("1");
        let b = UserId::local("2");
        store
            .insert_profile(GameId::SoundCircuit, 1, b.clone(), "B", Default::default())
            .await;

        let rows = store
            .any_profiles(GameId::SoundCircuit, 1, &[a.clone(), b.clone()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, a);
        assert!(rows[0].1.is_none());
        assert_eq!(rows[1].0, b);
        assert!(rows[1].1.is_some());
    }
}
