//! Room code generation.
//!
//! Codes use Crockford's base32 alphabet so they survive being read
//! aloud or typed from a screenshot: no I, L, O or U.

use duelsync_protocol::{ProtocolError, RoomCode};
use rand::Rng;

const CROCKFORD: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of generated codes.
pub const ROOM_CODE_LEN: usize = 6;

/// Generates a random room code.
///
/// Uniqueness is not guaranteed here; the store's unique key is what
/// catches a collision and the coordinator retries.
pub fn generate_room_code() -> Result<RoomCode, ProtocolError> {
    let mut rng = rand::rng();
    let raw: String = (0..ROOM_CODE_LEN)
        .map(|_| CROCKFORD[rng.random_range(0..CROCKFORD.len())] as char)
        .collect();
    RoomCode::parse(&raw)
}
