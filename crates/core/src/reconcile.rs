//! Local/remote profile reconciliation.
//!
//! [`ProfileReconciler`] is the heart of ProfileMesh. Each retrieval:
//!
//! 1. Classifies requested identities as store-owned or card-derived.
//! 2. Queries the local store and the peer federation concurrently.
//! 3. Disambiguates exact vs partial matches returned by peers.
//! 4. Normalizes accepted records into the canonical profile shape.
//! 5. Merges both result sets under the documented ordering rules.
//!
//! Results are merged only after every query of the operation has
//! completed; partial merges are never observable.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::ReconcileError;
use crate::fetch::RemoteFetcher;
use crate::identity::{self, IdentityMapper};
use crate::models::{
    CanonicalProfile, CardId, ExtId, GameId, RefId, UserId, ANY_VERSION,
};
use crate::normalize::normalize;
use crate::store::LocalStore;

/// The reconciliation merger over the local store and the peer federation.
pub struct ProfileReconciler {
    store: Arc<dyn LocalStore>,
    fetcher: RemoteFetcher,
    mapper: IdentityMapper,
}

impl ProfileReconciler {
    /// Create a reconciler over a local store and a configured fetcher.
    pub fn new(store: Arc<dyn LocalStore>, fetcher: RemoteFetcher) -> Self {
        info!(peers = fetcher.peer_count(), "initializing profile reconciler");
        let mapper = IdentityMapper::new(store.clone());
        Self {
            store,
            fetcher,
            mapper,
        }
    }

    // -----------------------------------------------------------------------
    // Identity lookups
    // -----------------------------------------------------------------------

    /// The identity holding this card: the store's mapping when one exists,
    /// otherwise the derived virtual identity. Always answers.
    pub async fn from_card(&self, card: &CardId) -> Result<UserId, ReconcileError> {
        Ok(self.mapper.resolve_card(card).await?)
    }

    /// The identity a reference id was minted for, if any.
    pub async fn from_ref_id(
        &self,
        game: GameId,
        version: u32,
        ref_id: &RefId,
    ) -> Result<Option<UserId>, ReconcileError> {
        Ok(self.store.user_from_ref_id(game, version, ref_id).await?)
    }

    /// The identity an external id was minted for, if any.
    pub async fn from_ext_id(
        &self,
        game: GameId,
        version: u32,
        ext_id: ExtId,
    ) -> Result<Option<UserId>, ReconcileError> {
        Ok(self.store.user_from_ext_id(game, version, ext_id).await?)
    }

    // -----------------------------------------------------------------------
    // Single lookup
    // -----------------------------------------------------------------------

    /// The profile for exactly this game/version.
    ///
    /// Virtual identities are resolved against the federation; only records
    /// a peer marks `exact` are accepted.
    pub async fn get_profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, ReconcileError> {
        if identity::is_virtual(user) {
            self.remote_profile_request(game, version, user, true).await
        } else {
            Ok(self.store.profile(game, version, user).await?)
        }
    }

    /// The best available profile for this game, exact or not.
    ///
    /// Partial peer matches are accepted with their version downgraded to
    /// the [`ANY_VERSION`] sentinel.
    pub async fn get_any_profile(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
    ) -> Result<Option<CanonicalProfile>, ReconcileError> {
        if identity::is_virtual(user) {
            self.remote_profile_request(game, version, user, false).await
        } else {
            Ok(self.store.any_profile(game, version, user).await?)
        }
    }

    /// Fan out a single card to the federation and take the first usable
    /// match, in peer-configuration order.
    async fn remote_profile_request(
        &self,
        game: GameId,
        version: u32,
        user: &UserId,
        strict: bool,
    ) -> Result<Option<CanonicalProfile>, ReconcileError> {
        let card = identity::virtual_to_card(user)?;

        // Mint the ids the canonical profile must always carry.
        let ref_id = self.store.ref_id(game, version, user).await?;
        let ext_id = self.store.ext_id(game, version, user).await?;

        let records = self
            .fetcher
            .by_cards(game, version, vec![card.clone()])
            .await?;

        for record in &records {
            if !record.cards().contains(&card) {
                continue;
            }

            let exact = record.match_quality().is_exact();
            if strict && !exact {
                debug!(card = %card, "skipping partial match, scan continues");
                continue;
            }

            let resolved_version = if exact { version } else { ANY_VERSION };
            let profile = normalize(
                &record.sanitized(),
                game,
                resolved_version,
                ref_id,
                ext_id,
            );
            debug!(card = %card, exact, "accepted remote profile");
            return Ok(Some(profile));
        }

        debug!(card = %card, "no remote profile found");
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Batch lookup
    // -----------------------------------------------------------------------

    /// Profiles for a mixed batch of identities.
    ///
    /// Returns one tuple per requested identity: local results first (in
    /// the store's own order), then remote matches in response order, then
    /// unmatched virtual identities as explicit `(identity, None)` rows in
    /// no guaranteed order.
    pub async fn get_any_profiles(
        &self,
        game: GameId,
        version: u32,
        users: &[UserId],
    ) -> Result<Vec<(UserId, Option<CanonicalProfile>)>, ReconcileError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let (virtual_ids, local_ids): (Vec<UserId>, Vec<UserId>) = users
            .iter()
            .cloned()
            .partition(|user| identity::is_virtual(user));

        if virtual_ids.is_empty() {
            // Purely local batch; no fan-out needed.
            return Ok(self.store.any_profiles(game, version, &local_ids).await?);
        }

        // Reverse map consumed as records satisfy requested cards.
        let mut card_to_user: HashMap<CardId, UserId> = HashMap::new();
        let mut cards = Vec::with_capacity(virtual_ids.len());
        for user in &virtual_ids {
            let card = identity::virtual_to_card(user)?;
            cards.push(card.clone());
            card_to_user.insert(card, user.clone());
        }

        let (local_rows, remote_records) = tokio::join!(
            self.store.any_profiles(game, version, &local_ids),
            self.fetcher.by_cards(game, version, cards),
        );
        let mut results = local_rows?;
        let remote_records = remote_records?;

        for record in &remote_records {
            // A single record may satisfy several requested cards; each one
            // consumes its own copy of the record.
            for card in record.cards() {
                let Some(user) = card_to_user.get(&card).cloned() else {
                    continue;
                };

                let exact = record.match_quality().is_exact();
                let resolved_version = if exact { version } else { ANY_VERSION };
                let ref_id = self.store.ref_id(game, version, &user).await?;
                let ext_id = self.store.ext_id(game, version, &user).await?;
                let profile = normalize(
                    &record.sanitized(),
                    game,
                    resolved_version,
                    ref_id,
                    ext_id,
                );

                results.push((user, Some(profile)));
                card_to_user.remove(&card);
            }
        }

        // Whatever is left was answered by no peer; report it explicitly
        // rather than dropping the identity from the result.
        for user in card_to_user.into_values() {
            results.push((user, None));
        }

        debug!(
            requested = users.len(),
            returned = results.len(),
            "batch lookup merged"
        );
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Every known profile for the game/version, local and federated.
    ///
    /// Local profiles always win for identities this server knows about;
    /// remote-only records are materialized as virtual identities only when
    /// the peer marked them `exact`.
    pub async fn get_all_profiles(
        &self,
        game: GameId,
        version: u32,
    ) -> Result<Vec<(UserId, CanonicalProfile)>, ReconcileError> {
        let (local_cards, local_profiles, remote_records) = tokio::join!(
            self.store.all_cards(),
            self.store.all_profiles(game, version),
            self.fetcher.all(game, version),
        );

        let card_to_local: HashMap<CardId, UserId> = local_cards?.into_iter().collect();
        let mut merged = OrderedProfiles::from_local(local_profiles?);
        let remote_records = remote_records?;

        for record in &remote_records {
            let mut record_cards = record.cards();
            record_cards.sort();

            if record_cards.is_empty() {
                // Anonymous profile; no identity to attach it to.
                continue;
            }
            if record_cards
                .iter()
                .any(|card| card_to_local.contains_key(card))
            {
                debug!("remote profile overlaps a local identity, keeping local data");
                continue;
            }
            if !record.match_quality().is_exact() {
                // Never materialize an identity from an ambiguous match.
                continue;
            }

            // Smallest card of the sorted list keys the virtual identity,
            // so repeated enumerations stay stable.
            let user = identity::card_to_virtual(&record_cards[0]);
            let ref_id = self.store.ref_id(game, version, &user).await?;
            let ext_id = self.store.ext_id(game, version, &user).await?;
            let profile = normalize(&record.sanitized(), game, version, ref_id, ext_id);
            merged.insert(user, profile);
        }

        let rows = merged.into_vec();
        debug!(count = rows.len(), "enumeration merged");
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Ordered merge buffer
// ---------------------------------------------------------------------------

/// Insertion-ordered identity -> profile buffer with last-write-wins
/// inserts.
///
/// Local profiles are seeded first, so they lead the final output; inserts
/// never shuffle existing rows.
struct OrderedProfiles {
    rows: Vec<(UserId, CanonicalProfile)>,
    index: HashMap<UserId, usize>,
}

impl OrderedProfiles {
    fn from_local(rows: Vec<(UserId, CanonicalProfile)>) -> Self {
        let mut buffer = Self {
            rows: Vec::new(),
            index: HashMap::new(),
        };
        for (user, profile) in rows {
            buffer.insert(user, profile);
        }
        buffer
    }

    fn insert(&mut self, user: UserId, profile: CanonicalProfile) {
        match self.index.get(&user) {
            Some(&pos) => self.rows[pos].1 = profile,
            None => {
                self.index.insert(user.clone(), self.rows.len());
                self.rows.push((user, profile));
            }
        }
    }

    fn into_vec(self) -> Vec<(UserId, CanonicalProfile)> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileExtras;

    fn profile(name: &str) -> CanonicalProfile {
        CanonicalProfile {
            name: name.to_string(),
            game: GameId::GrooveCoast,
            version: 2,
            ref_id: RefId::new("R00000001"),
            ext_id: ExtId::new(1),
            extras: ProfileExtras::default(),
        }
    }

    #[test]
    fn test_ordered_profiles_keeps_insertion_order() {
        let mut buffer = OrderedProfiles::from_local(vec![
            (UserId::local("1"), profile("FIRST")),
            (UserId::local("2"), profile("SECOND")),
        ]);
        buffer.insert(UserId::local("3"), profile("THIRD"));

        let rows = buffer.into_vec();
        let names: Vec<&str> = rows.iter().map(|(_, p)| p.name.as_str()).collect();
        assert_eq!(names, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn test_ordered_profiles_last_write_wins_in_place() {
        let mut buffer = OrderedProfiles::from_local(vec![
            (UserId::local("1"), profile("FIRST")),
            (UserId::local("2"), profile("SECOND")),
        ]);
        buffer.insert(UserId::local("1"), profile("REPLACED"));

        let rows = buffer.into_vec();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, UserId::local("1"));
        assert_eq!(rows[0].1.name, "REPLACED");
        assert_eq!(rows[1].1.name, "SECOND");
    }
}
