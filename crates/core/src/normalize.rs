//! Profile normalization.
//!
//! Turns a raw profile payload into the canonical shape: the fixed common
//! fields plus whichever optional per-game fields the title defines.
//! Per-game extraction is table-driven -- adding a title means adding one
//! entry to [`EXTRACTORS`], never a branch in the merge logic.
//!
//! Normalization never fails: malformed or missing fields read as absent.

use crate::models::{
    CanonicalProfile, ExtId, GameId, PlayConfig, ProfileExtras, QproAvatar, RawProfile, RefId,
};

type ExtractorFn = fn(&RawProfile, &mut ProfileExtras);

/// Per-game optional-field extractors.
///
/// Titles without an entry get the fixed fields only.
const EXTRACTORS: &[(GameId, ExtractorFn)] = &[
    (GameId::DanceStage, extract_dance_stage),
    (GameId::BeatStation, extract_beat_station),
    (GameId::PopCarnival, extract_pop_carnival),
    (GameId::RhythmOrbit, extract_rhythm_orbit),
];

fn extractor_for(game: GameId) -> Option<ExtractorFn> {
    EXTRACTORS
        .iter()
        .find(|(g, _)| *g == game)
        .map(|(_, f)| *f)
}

/// Build a canonical profile from a raw payload.
///
/// Every call constructs a fresh, independently-owned value; the input is
/// not consumed or mutated.
pub fn normalize(
    raw: &RawProfile,
    game: GameId,
    version: u32,
    ref_id: RefId,
    ext_id: ExtId,
) -> CanonicalProfile {
    let name = raw.str_field("name").unwrap_or_default().to_string();

    let mut extras = ProfileExtras::default();
    if let Some(extract) = extractor_for(game) {
        extract(raw, &mut extras);
    }

    CanonicalProfile {
        name,
        game,
        version,
        ref_id,
        ext_id,
        extras,
    }
}

fn extract_dance_stage(raw: &RawProfile, extras: &mut ProfileExtras) {
    extras.area = raw.int_field("area");
}

fn extract_beat_station(raw: &RawProfile, extras: &mut ProfileExtras) {
    extras.pid = raw.int_field("area");

    let qpro = raw.nested("qpro");
    extras.qpro = Some(QproAvatar {
        head: qpro.int_field("head"),
        hair: qpro.int_field("hair"),
        face: qpro.int_field("face"),
        body: qpro.int_field("body"),
        hand: qpro.int_field("hand"),
    });
}

fn extract_pop_carnival(raw: &RawProfile, extras: &mut ProfileExtras) {
    extras.chara = raw.int_field("character");
}

fn extract_rhythm_orbit(raw: &RawProfile, extras: &mut ProfileExtras) {
    extras.config = raw.int_field("icon").map(|icon_id| PlayConfig { icon_id });
}
