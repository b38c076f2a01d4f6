//! Identity virtualization for card-only players.
//!
//! The resolution hierarchy is:
//! 1. Local store mapping (card was registered on this server)
//! 2. Fallback: derive a virtual identity from the card id alone
//!
//! Virtual identities are a pure function of the card id -- never allocated,
//! never persisted, reconstructable at any point in a request.

pub mod mapper;

pub use mapper::{card_to_virtual, is_virtual, virtual_to_card, IdentityMapper};

/// Prefix marking a card-derived identity.
///
/// Local stores must never mint identifiers starting with this prefix;
/// that reservation is what keeps derivation injective across both kinds.
pub const VIRTUAL_PREFIX: &str = "remote:";
