//! Domain model types used throughout ProfileMesh.
//!
//! These types bridge the reconciliation engine, the local-store seam, and
//! the peer wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Integer value peers use to mean "field not set".
///
/// Converted to `Option::None` at the boundary by [`RawProfile::int_field`]
/// so the merge logic never compares against it.
const ABSENT_SENTINEL: i64 = -1;

/// Reserved version number meaning "unknown/unspecified version".
///
/// Used when a peer could only produce a partial match for the requested
/// game/version pair.
pub const ANY_VERSION: u32 = 0;

// ---------------------------------------------------------------------------
// Card identifier
// ---------------------------------------------------------------------------

/// Opaque identifier of a physical card.
///
/// Case-insensitive at the wire boundary: the constructor canonicalizes to
/// uppercase, and every comparison in the engine happens on the canonical
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Create a card id, canonicalizing to uppercase.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(CardId::new(raw))
    }
}

// ---------------------------------------------------------------------------
// User identity
// ---------------------------------------------------------------------------

/// Opaque player identity.
///
/// Two kinds share this type, distinguished by provenance rather than by a
/// separate type: identities assigned by the local store, and *virtual*
/// identities derived from a card id for players only a peer server knows.
/// The [`identity`](crate::identity) module owns derivation and the
/// virtual/local predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a store-assigned identity.
    ///
    /// Stores must never mint identifiers carrying the virtual-identity
    /// prefix (see [`identity`](crate::identity)); the derivation
    /// invariants rely on it.
    pub fn local(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn from_raw(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game identifier
// ---------------------------------------------------------------------------

/// A title on the network.
///
/// A (`GameId`, version) pair identifies a specific release. Adding a title
/// requires at most one matching entry in the normalizer's extractor table;
/// the merge logic never branches on individual games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameId {
    DanceStage,
    BeatStation,
    PopCarnival,
    RhythmOrbit,
    GrooveCoast,
    SoundCircuit,
}

impl GameId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DanceStage => "dance-stage",
            Self::BeatStation => "beat-station",
            Self::PopCarnival => "pop-carnival",
            Self::RhythmOrbit => "rhythm-orbit",
            Self::GrooveCoast => "groove-coast",
            Self::SoundCircuit => "sound-circuit",
        }
    }

    /// Parse a wire name into a `GameId`.
    pub fn from_str_val(s: &str) -> Option<Self> {
        match s {
            "dance-stage" => Some(Self::DanceStage),
            "beat-station" => Some(Self::BeatStation),
            "pop-carnival" => Some(Self::PopCarnival),
            "rhythm-orbit" => Some(Self::RhythmOrbit),
            "groove-coast" => Some(Self::GrooveCoast),
            "sound-circuit" => Some(Self::SoundCircuit),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Match quality
// ---------------------------------------------------------------------------

/// How specifically a peer matched the requested game/version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// The profile is specifically for the requested game/version.
    Exact,
    /// The profile exists for the card but is not confirmed for the
    /// requested version.
    #[default]
    Partial,
}

impl MatchQuality {
    /// Parse a marker string; anything other than `"exact"` is partial.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "exact" => Self::Exact,
            _ => Self::Partial,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

impl std::fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

// ---------------------------------------------------------------------------
// Store-minted identifiers
// ---------------------------------------------------------------------------

/// Per (game, version, identity) reference id minted by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per (game, version, identity) external id minted by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtId(i64);

impl ExtId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ExtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw profile payload
// ---------------------------------------------------------------------------

/// An untyped profile payload as returned by a peer or stored locally.
///
/// Accessors convert the wire conventions at the boundary: integer fields
/// carrying the `-1` sentinel read as absent, the card list is
/// case-normalized, and a missing match marker reads as
/// [`MatchQuality::Partial`]. Malformed fields are treated as absent, never
/// as errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProfile(serde_json::Map<String, Value>);

impl RawProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; anything other than an object becomes an empty
    /// payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// A string field, if present and actually a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// An integer field, if present, integral, and not the `-1` absence
    /// sentinel.
    pub fn int_field(&self, key: &str) -> Option<i64> {
        self.0
            .get(key)
            .and_then(Value::as_i64)
            .filter(|v| *v != ABSENT_SENTINEL)
    }

    /// A nested object field; absent or non-object reads as an empty
    /// payload.
    pub fn nested(&self, key: &str) -> RawProfile {
        match self.0.get(key) {
            Some(Value::Object(map)) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// The case-normalized card list. Non-string entries are skipped.
    pub fn cards(&self) -> Vec<CardId> {
        match self.0.get("cards") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(CardId::new)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The match-quality marker, defaulting to partial.
    pub fn match_quality(&self) -> MatchQuality {
        self.str_field("match")
            .map(MatchQuality::from_str_val)
            .unwrap_or_default()
    }

    /// An independent copy with the `cards` and `match` routing fields
    /// stripped, ready for normalization.
    pub fn sanitized(&self) -> RawProfile {
        let mut map = self.0.clone();
        map.remove("cards");
        map.remove("match");
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Canonical profile
// ---------------------------------------------------------------------------

/// Avatar customization composite carried by beat-station profiles.
///
/// Each part is independently optional; absent parts are omitted on the
/// wire, never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QproAvatar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<i64>,
}

impl QproAvatar {
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
            && self.hair.is_none()
            && self.face.is_none()
            && self.body.is_none()
            && self.hand.is_none()
    }
}

/// Nested per-game configuration block (icon-based titles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayConfig {
    pub icon_id: i64,
}

/// Optional per-game fields of a canonical profile.
///
/// Only the subset relevant to the profile's game is ever populated; the
/// rest stays `None` and is omitted from serialized output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileExtras {
    /// Play area (dance-stage).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<i64>,
    /// Player id / region (beat-station).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    /// Avatar customization (beat-station).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qpro: Option<QproAvatar>,
    /// Selected character (pop-carnival).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chara: Option<i64>,
    /// Icon configuration (rhythm-orbit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PlayConfig>,
}

/// The normalized profile shape every retrieval operation returns.
///
/// Instances are built fresh per request and never shared or mutated in
/// place afterward; callers always receive an independent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    pub name: String,
    pub game: GameId,
    pub version: u32,
    pub ref_id: RefId,
    pub ext_id: ExtId,
    #[serde(flatten)]
    pub extras: ProfileExtras,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_id_canonicalizes_case() {
        assert_eq!(CardId::new("e004abc"), CardId::new("E004ABC"));
        assert_eq!(CardId::new("e004abc").as_str(), "E004ABC");
    }

    #[test]
    fn test_card_id_deserializes_canonical() {
        let card: CardId = serde_json::from_value(json!("a1b2c3")).unwrap();
        assert_eq!(card.as_str(), "A1B2C3");
    }

    #[test]
    fn test_game_id_round_trip() {
        for game in [
            GameId::DanceStage,
            GameId::BeatStation,
            GameId::PopCarnival,
            GameId::RhythmOrbit,
            GameId::GrooveCoast,
            GameId::SoundCircuit,
        ] {
            assert_eq!(GameId::from_str_val(game.as_str()), Some(game));
        }
        assert_eq!(GameId::from_str_val("quiz-castle"), None);
    }

    #[test]
    fn test_match_quality_defaults_to_partial() {
        assert_eq!(MatchQuality::from_str_val("exact"), MatchQuality::Exact);
        assert_eq!(MatchQuality::from_str_val("partial"), MatchQuality::Partial);
        assert_eq!(MatchQuality::from_str_val("anything"), MatchQuality::Partial);
        assert_eq!(MatchQuality::default(), MatchQuality::Partial);
    }

    #[test]
    fn test_int_field_sentinel_is_absent() {
        let raw = RawProfile::from_value(json!({
            "area": 13,
            "character": -1,
            "name": "PLAYER",
        }));
        assert_eq!(raw.int_field("area"), Some(13));
        assert_eq!(raw.int_field("character"), None);
        assert_eq!(raw.int_field("missing"), None);
        assert_eq!(raw.int_field("name"), None);
    }

    #[test]
    fn test_cards_are_case_normalized() {
        let raw = RawProfile::from_value(json!({
            "cards": ["e004aa", "E004BB", 7],
        }));
        assert_eq!(
            raw.cards(),
            vec![CardId::new("E004AA"), CardId::new("E004BB")]
        );
    }

    #[test]
    fn test_sanitized_strips_routing_fields() {
        let raw = RawProfile::from_value(json!({
            "cards": ["E004AA"],
            "match": "exact",
            "name": "PLAYER",
        }));
        let clean = raw.sanitized();
        assert!(clean.get("cards").is_none());
        assert!(clean.get("match").is_none());
        assert_eq!(clean.str_field("name"), Some("PLAYER"));
        // The original is untouched.
        assert_eq!(raw.cards().len(), 1);
    }

    #[test]
    fn test_nested_missing_reads_empty() {
        let raw = RawProfile::from_value(json!({ "qpro": 3 }));
        assert_eq!(raw.nested("qpro").int_field("head"), None);
        assert_eq!(raw.nested("absent").int_field("head"), None);
    }

    #[test]
    fn test_extras_skip_absent_fields() {
        let extras = ProfileExtras {
            qpro: Some(QproAvatar {
                hair: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&extras).unwrap();
        assert_eq!(value, json!({ "qpro": { "hair": 3 } }));
    }
}
