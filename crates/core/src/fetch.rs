//! Concurrent peer fan-out.
//!
//! [`RemoteFetcher`] issues one query per configured peer, all in flight at
//! once, and flattens the responses into a single list ordered by peer
//! configuration order (each peer's internal record order preserved).
//! Dropping the returned future cancels every outstanding peer call.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::{AppConfig, PeerFailurePolicy};
use crate::errors::PeerError;
use crate::models::{CardId, GameId, RawProfile};
use crate::peer::{HttpPeer, PeerClient, ProfileFilter};

/// Fan-out orchestrator over the configured peer set.
#[derive(Clone)]
pub struct RemoteFetcher {
    peers: Vec<Arc<dyn PeerClient>>,
    policy: PeerFailurePolicy,
}

impl RemoteFetcher {
    pub fn new(peers: Vec<Arc<dyn PeerClient>>, policy: PeerFailurePolicy) -> Self {
        Self { peers, policy }
    }

    /// Build a fetcher from configuration, one HTTP client per peer entry.
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = std::time::Duration::from_secs(config.remote.timeout_secs);
        let peers = config
            .peers
            .iter()
            .map(|entry| {
                Arc::new(HttpPeer::new(
                    entry.name.clone(),
                    entry.url.clone(),
                    entry.token.clone(),
                    timeout,
                )) as Arc<dyn PeerClient>
            })
            .collect();
        Self::new(peers, config.remote.failure_policy)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Query every peer for profiles matching any of the given cards.
    pub async fn by_cards(
        &self,
        game: GameId,
        version: u32,
        cards: Vec<CardId>,
    ) -> Result<Vec<RawProfile>, PeerError> {
        self.fan_out(game, version, ProfileFilter::Cards(cards))
            .await
    }

    /// Query every peer for all profiles it has for the game/version.
    pub async fn all(&self, game: GameId, version: u32) -> Result<Vec<RawProfile>, PeerError> {
        self.fan_out(game, version, ProfileFilter::All).await
    }

    /// One concurrent query per peer; flatten in configuration order.
    ///
    /// A failing peer degrades to an empty contribution under
    /// [`PeerFailurePolicy::Degrade`] -- unless it is the only configured
    /// peer, in which case the failure passes through. Under
    /// [`PeerFailurePolicy::Fatal`] the first failure (in configuration
    /// order) aborts the whole fan-out.
    async fn fan_out(
        &self,
        game: GameId,
        version: u32,
        filter: ProfileFilter,
    ) -> Result<Vec<RawProfile>, PeerError> {
        if self.peers.is_empty() {
            debug!("no peers configured, remote fetch is empty");
            return Ok(Vec::new());
        }

        let calls = self
            .peers
            .iter()
            .map(|peer| peer.get_profiles(game, version, &filter));
        let results = join_all(calls).await;

        let solo = self.peers.len() == 1;
        let mut flat = Vec::new();
        for (peer, result) in self.peers.iter().zip(results) {
            match result {
                Ok(records) => {
                    debug!(peer = %peer.name(), count = records.len(), "peer responded");
                    flat.extend(records);
                }
                Err(e) if self.policy == PeerFailurePolicy::Fatal || solo => {
                    warn!(peer = %peer.name(), error = %e, "peer query failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        peer = %peer.name(),
                        error = %e,
                        "peer query failed, degrading to empty response"
                    );
                }
            }
        }

        Ok(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct ScriptedPeer {
        name: String,
        records: Vec<RawProfile>,
    }

    impl ScriptedPeer {
        fn new(name: &str, names: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                records: names
                    .iter()
                    .map(|n| RawProfile::from_value(json!({ "name": n })))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PeerClient for ScriptedPeer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn get_profiles(
            &self,
            _game: GameId,
            _version: u32,
            _filter: &ProfileFilter,
        ) -> Result<Vec<RawProfile>, PeerError> {
            Ok(self.records.clone())
        }
    }

    struct FailingPeer {
        name: String,
    }

    #[async_trait]
    impl PeerClient for FailingPeer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn get_profiles(
            &self,
            _game: GameId,
            _version: u32,
            _filter: &ProfileFilter,
        ) -> Result<Vec<RawProfile>, PeerError> {
            Err(PeerError::Unavailable("connection refused".into()))
        }
    }

    fn names(records: &[RawProfile]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.str_field("name").unwrap_or(""))
            .collect()
    }

    #[tokio::test]
    async fn test_flatten_preserves_configuration_order() {
        let fetcher = RemoteFetcher::new(
            vec![
                Arc::new(ScriptedPeer::new("alpha", &["A1", "A2"])) as Arc<dyn PeerClient>,
                Arc::new(ScriptedPeer::new("beta", &["B1"])),
                Arc::new(ScriptedPeer::new("gamma", &["C1", "C2"])),
            ],
            PeerFailurePolicy::Degrade,
        );

        let records = fetcher.all(GameId::GrooveCoast, 2).await.unwrap();
        assert_eq!(names(&records), vec!["A1", "A2", "B1", "C1", "C2"]);
    }

    #[tokio::test]
    async fn test_degrade_skips_failing_peer() {
        let fetcher = RemoteFetcher::new(
            vec![
                Arc::new(FailingPeer {
                    name: "alpha".into(),
                }) as Arc<dyn PeerClient>,
                Arc::new(ScriptedPeer::new("beta", &["B1"])),
            ],
            PeerFailurePolicy::Degrade,
        );

        let records = fetcher
            .by_cards(GameId::DanceStage, 7, vec![CardId::new("E004AA")])
            .await
            .unwrap();
        assert_eq!(names(&records), vec!["B1"]);
    }

    #[tokio::test]
    async fn test_fatal_propagates_first_failure() {
        let fetcher = RemoteFetcher::new(
            vec![
                Arc::new(ScriptedPeer::new("alpha", &["A1"])) as Arc<dyn PeerClient>,
                Arc::new(FailingPeer {
                    name: "beta".into(),
                }),
            ],
            PeerFailurePolicy::Fatal,
        );

        let result = fetcher.all(GameId::GrooveCoast, 2).await;
        assert!(matches!(result, Err(PeerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_sole_failing_peer_propagates_even_when_degrading() {
        let fetcher = RemoteFetcher::new(
            vec![Arc::new(FailingPeer {
                name: "alpha".into(),
            }) as Arc<dyn PeerClient>],
            PeerFailurePolicy::Degrade,
        );

        let result = fetcher.all(GameId::GrooveCoast, 2).await;
        assert!(matches!(result, Err(PeerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_no_peers_yields_empty() {
        let fetcher = RemoteFetcher::new(Vec::new(), PeerFailurePolicy::Degrade);
        let records = fetcher.all(GameId::GrooveCoast, 2).await.unwrap();
        assert!(records.is_empty());
    }
}
