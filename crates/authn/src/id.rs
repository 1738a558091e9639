//! Random record identifiers.
//!
//! Tokens and checks share one id format: [`ID_LEN`] characters drawn from
//! `a-z0-9`.

use rand::Rng;

/// Length of every generated id.
pub const ID_LEN: usize = 20;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Produces fresh record ids.
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    /// Returns a new id. Uniqueness is not guaranteed; callers rely on the
    /// store's insert-if-absent to detect collisions.
    fn generate(&self) -> String;
}

/// [`IdGenerator`] using the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..ID_LEN)
            .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
            .collect()
    }
}

/// Returns `true` if `id` has the generated shape: exactly [`ID_LEN`]
/// lowercase ASCII letters or digits.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
