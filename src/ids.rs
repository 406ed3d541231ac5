//! Short random identifiers.
//!
//! Identifiers are drawn from a 32 symbol alphabet that leaves out characters easily confused
//! when read aloud or copied by hand (`i`, `l`, `o`, `0`, `1`).

use crate::error::Error;
use rand::Rng;
use std::sync::Arc;

/// The symbols identifiers are drawn from.
pub const ALPHABET: &[u8; 32] = b"abcdefghjkmnpqrstuvwxyz23456789-";

pub const MIN_LENGTH: usize = 2;
pub const MAX_LENGTH: usize = 255;

/// A reusable identifier factory. Every call returns a fresh identifier of the length the
/// generator was created with.
pub type Generator = Arc<dyn Fn() -> String + Send + Sync>;

/// Create a [`Generator`] producing identifiers of `length` symbols.
///
/// # Errors
///
/// Returns [`Error::InvalidIdLength`] if `length` is outside [`MIN_LENGTH`]..=[`MAX_LENGTH`].
pub fn generator(length: usize) -> Result<Generator, Error> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
        return Err(Error::InvalidIdLength(length));
    }
    Ok(Arc::new(move || {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }))
}
