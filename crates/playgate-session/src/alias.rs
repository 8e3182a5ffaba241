//! Pseudonymous handles derived from external identities.
//!
//! A handle is the external identity with every printable ASCII
//! character rotated one step forward through the 95-character range
//! `' '..='~'`. The rotation is a bijection on that range, so it never
//! produces a non-printable key and can be undone with
//! [`decode_handle`]. Characters outside the range are passed through
//! unchanged.
//!
//! This is obfuscation, not encryption: anyone who knows the scheme
//! can recover the identity. Two distinct identities never share a
//! handle, but nothing stops a future scheme change from colliding
//! with handles minted under this one.

use playgate_protocol::PlayerHandle;

const FIRST_PRINTABLE: u32 = ' ' as u32;
const PRINTABLE_SPAN: u32 = 95;
const SHIFT: u32 = 1;

/// Derives the handle for an external identity.
pub fn derive_handle(external_identity: &str) -> PlayerHandle {
    PlayerHandle(external_identity.chars().map(|c| rotate(c, SHIFT)).collect())
}

/// Recovers the external identity from a handle.
pub fn decode_handle(handle: &PlayerHandle) -> String {
    handle
        .as_str()
        .chars()
        .map(|c| rotate(c, PRINTABLE_SPAN - SHIFT))
        .collect()
}

fn rotate(c: char, by: u32) -> char {
    let code = c as u32;
    if !(FIRST_PRINTABLE..FIRST_PRINTABLE + PRINTABLE_SPAN).contains(&code) {
        return c;
    }
    let rotated = (code - FIRST_PRINTABLE + by) % PRINTABLE_SPAN + FIRST_PRINTABLE;
    // Always within ' '..='~', so the conversion cannot fail.
    char::from_u32(rotated).unwrap_or(c)
}
