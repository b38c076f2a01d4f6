//! REST transport for the peer seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{PeerClient, ProfileFilter};
use crate::errors::PeerError;
use crate::models::{CardId, GameId, RawProfile};

/// Request body for the profile query endpoint.
#[derive(Debug, Serialize)]
struct ProfilesRequest<'a> {
    #[serde(rename = "type")]
    id_type: &'static str,
    ids: &'a [CardId],
}

/// Response envelope returned by a peer.
#[derive(Debug, Deserialize)]
struct ProfilesResponse {
    #[serde(default)]
    profiles: Vec<RawProfile>,
}

/// Asynchronous REST client for one federation peer.
#[derive(Clone)]
pub struct HttpPeer {
    name: String,
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPeer {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let name = name.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("profilemesh/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        info!(peer = %name, base_url = %base_url, "created HttpPeer");
        Self {
            name,
            http,
            base_url,
            token,
        }
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, PeerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PeerError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PeerClient for HttpPeer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, filter), fields(peer = %self.name))]
    async fn get_profiles(
        &self,
        game: GameId,
        version: u32,
        filter: &ProfileFilter,
    ) -> Result<Vec<RawProfile>, PeerError> {
        let url = format!("{}/v1/profiles/{}/{}", self.base_url, game, version);
        let body = ProfilesRequest {
            id_type: filter.id_type(),
            ids: filter.ids(),
        };

        let mut req = self.http.post(&url).json(&body);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = Self::check_response(req.send().await?).await?;
        let envelope: ProfilesResponse = resp
            .json()
            .await
            .map_err(|e| PeerError::ParseError(e.to_string()))?;

        debug!(count = envelope.profiles.len(), "fetched profiles");
        Ok(envelope.profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let cards = vec![CardId::new("e004aa"), CardId::new("E004BB")];
        let filter = ProfileFilter::Cards(cards);
        let body = ProfilesRequest {
            id_type: filter.id_type(),
            ids: filter.ids(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "type": "card", "ids": ["E004AA", "E004BB"] })
        );

        let all = ProfileFilter::All;
        let body = ProfilesRequest {
            id_type: all.id_type(),
            ids: all.ids(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "type": "server", "ids": [] })
        );
    }

    #[test]
    fn test_response_envelope_parse() {
        let envelope: ProfilesResponse = serde_json::from_value(json!({
            "profiles": [
                { "name": "PLAYER", "cards": ["e004aa"], "match": "exact" }
            ]
        }))
        .unwrap();
        assert_eq!(envelope.profiles.len(), 1);
        assert_eq!(envelope.profiles[0].str_field("name"), Some("PLAYER"));

        // Missing list reads as empty.
        let empty: ProfilesResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.profiles.is_empty());
    }
}
