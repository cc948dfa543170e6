//! Salted, iterated SHA-256 password hashes.
//!
//! Stored form: `sha256$<rounds>$<salt hex>$<digest hex>`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";
const ROUNDS: u32 = 10_000;

pub fn hash_password(password: &str) -> String {
    // A v4 UUID carries 122 random bits from the OS generator.
    let salt = hex::encode(Uuid::new_v4().as_bytes());
    let digest = derive(password, &salt, ROUNDS);
    format!("{SCHEME}${ROUNDS}${salt}${digest}")
}

/// Returns `false` for malformed hashes instead of failing.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    constant_time_eq(derive(password, salt, rounds).as_bytes(), expected.as_bytes())
}

fn derive(password: &str, salt: &str, rounds: u32) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(password.as_bytes())
            .finalize();
    }
    hex::encode(digest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("hunter22");
        assert!(stored.starts_with("sha256$10000$"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "sha256$x$aa$bb"));
        assert!(!verify_password("pw", "md5$1$aa$bb"));
        assert!(!verify_password("pw", "sha256$1$aa$bb$cc"));
    }
}
