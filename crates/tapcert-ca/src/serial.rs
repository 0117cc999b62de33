//! CA serial-number state.
//!
//! Signing tracks serials in `ca.srl`, created as a side effect of the
//! first signature: the file holds the hex serial to use next; each
//! signature consumes it and writes back the incremented value.

use std::fs;
use std::path::Path;

use rand::RngCore;

use crate::error::CaError;

/// Byte length of freshly seeded serials.
const SEED_LEN: usize = 16;

/// Longest serial accepted from an existing state file (RFC 5280 cap).
const MAX_LEN: usize = 20;

/// Consume the next serial from the state file at `path`.
///
/// If the file is absent it is seeded with a random positive serial.
/// Returns the serial to use for the current signature; the incremented
/// successor is persisted for the next one.
pub fn next_serial(path: &Path) -> crate::Result<Vec<u8>> {
    let current = if path.exists() {
        let text = fs::read_to_string(path)?;
        let trimmed = text.trim();
        let bytes = hex::decode(trimmed)
            .map_err(|_| CaError::Profile(format!("malformed serial state: {trimmed:?}")))?;
        if bytes.is_empty() || bytes.len() > MAX_LEN {
            return Err(CaError::Profile(format!(
                "serial state has unusable length {}",
                bytes.len()
            )));
        }
        bytes
    } else {
        random_serial()
    };

    fs::write(path, format!("{}\n", hex::encode_upper(incremented(&current))))?;
    Ok(current)
}

/// A random positive serial, high bit cleared so the DER integer stays
/// positive without padding.
pub(crate) fn random_serial() -> Vec<u8> {
    let mut bytes = vec![0u8; SEED_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes[0] &= 0x7f;
    bytes
}

fn incremented(serial: &[u8]) -> Vec<u8> {
    let mut next = serial.to_vec();
    for byte in next.iter_mut().rev() {
        let (value, carry) = byte.overflowing_add(1);
        *byte = value;
        if !carry {
            return next;
        }
    }
    next.insert(0, 1);
    next
}
