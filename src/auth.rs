#![forbid(unsafe_code)]

//! Account-credential hashing and process guard rails.
//!
//! Passwords are stored as `blake3$<salt>$<hex>`. This is a local,
//! single-machine trust model, not a hardened credential service; the point
//! is only that cleartext never reaches the persistence layer.

use anyhow::{Result, bail};
use nix::unistd::Uid;

const DIGEST_SCHEME: &str = "blake3";

/// Produces a fresh salted digest for `password`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let digest = digest_with(&salt, password);
    format!("{DIGEST_SCHEME}${salt}${digest}")
}

/// Checks `password` against a stored digest. Unknown schemes and malformed
/// values verify as false rather than erroring; a corrupted digest should
/// behave like a wrong password, not take the account down.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != DIGEST_SCHEME {
        return false;
    }
    let Ok(expected) = blake3::Hash::from_hex(expected_hex) else {
        return false;
    };
    // blake3::Hash equality is constant-time.
    hash_parts(salt, password) == expected
}

fn digest_with(salt: &str, password: &str) -> String {
    hash_parts(salt, password).to_hex().to_string()
}

fn hash_parts(salt: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// Fails fast when a binary is started as root. A hub instance owns plain
/// files under a user directory; running it privileged only invites
/// accidental writes into system paths.
pub fn ensure_not_root(process: &str) -> Result<()> {
    ensure_not_root_for(Uid::current(), process)
}

fn ensure_not_root_for(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!("{process} must not be run as root; use a regular user account");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let stored = hash_password("hunter2");
        assert!(stored.starts_with("blake3$"));
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("boost");
        let second = hash_password("boost");
        assert_ne!(first, second);
        assert!(verify_password("boost", &first));
        assert!(verify_password("boost", &second));
    }

    #[test]
    fn malformed_stored_values_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "blake3$missing-digest"));
        assert!(!verify_password("x", "blake3$salt$nothex"));
        assert!(!verify_password("x", "md5$salt$abcdef"));
    }

    #[test]
    fn ensure_not_root_allows_unprivileged_uid() {
        assert!(ensure_not_root_for(Uid::from_raw(1000), "tester").is_ok());
    }

    #[test]
    fn ensure_not_root_rejects_root_uid() {
        let err = ensure_not_root_for(Uid::from_raw(0), "tester").unwrap_err();
        assert!(err.to_string().contains("must not be run as root"));
    }
}
