//! Cryptographically strong token, PIN, and auth-key generation (C1).
//!
//! Every generator is seeded from the OS CSPRNG (`rand::rngs::OsRng`) so that
//! output is unpredictable across processes; nothing here is derived from a
//! process-local counter or a weak PRNG.

use rand::RngCore;
use rand::rngs::OsRng;

/// Number of raw bytes backing a 128-bit opaque token.
const TOKEN_BYTES: usize = 16;

/// Generate a 128-bit random, URL-safe token (QR token, API key material, etc).
pub fn new_token() -> String {
    random_url_safe(TOKEN_BYTES)
}

/// Generate a 128-bit random, URL-safe auth key.
///
/// Distinct call site from [`new_token`] even though the generator is the
/// same, so the two can diverge in entropy budget later without a caller
/// having to care which one it was calling.
pub fn new_auth_key() -> String {
    random_url_safe(TOKEN_BYTES)
}

fn random_url_safe(n_bytes: usize) -> String {
    let mut buf = vec![0u8; n_bytes];
    OsRng.fill_bytes(&mut buf);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, buf)
}

/// Generate a zero-padded decimal PIN of `length` digits, sampled uniformly
/// from `[0, 10^length)` via rejection sampling over a CSPRNG byte stream.
///
/// Modulo-bias (`rng.next_u32() % 10^length`) is unacceptable: it skews the
/// low end of the range whenever `10^length` does not evenly divide 2^32.
/// Rejection sampling over the largest multiple of the modulus below 2^32
/// keeps every output value equiprobable (P8).
pub fn new_pin(length: u8) -> String {
    assert!(length > 0 && length <= 9, "pin length must be in 1..=9");
    let modulus: u32 = 10u32.pow(length as u32);
    let limit = u32::MAX - (u32::MAX % modulus);

    let value = loop {
        let candidate = OsRng.next_u32();
        if candidate < limit {
            break candidate % modulus;
        }
    };

    format!("{value:0width$}", width = length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn pins_are_zero_padded_six_digits() {
        for _ in 0..1000 {
            let pin = new_pin(6);
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn pins_cover_the_range_over_many_samples() {
        let mut seen = HashSet::new();
        for _ in 0..5000 {
            seen.insert(new_pin(4));
        }
        // With only 10^4 possible values and 5000 samples we expect broad
        // coverage, not full coverage; this is a coarse sanity check, not P8.
        assert!(seen.len() > 3000);
    }
}
