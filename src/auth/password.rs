use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";

/// Hash a password with a fresh random salt.
///
/// Output format: `sha256$<salt-hex>$<digest-hex>`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    hash_with_salt(password, &salt)
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    format!("{}${}${}", SCHEME, salt, digest(salt, password))
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if scheme != SCHEME || salt.is_empty() {
        return false;
    }

    let actual = digest(salt, password);
    // Fixed-length comparison over the full digest
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let stored = hash_password("correct horse");
        assert!(stored.starts_with("sha256$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn known_digest() {
        // sha256("salt" + "pw")
        let stored = hash_with_salt("pw", "salt");
        assert!(verify_password("pw", &stored));
        assert_eq!(stored.split('$').count(), 3);
    }

    #[test]
    fn malformed_hashes_never_match() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "plain-text-password"));
        assert!(!verify_password("pw", "md5$salt$abc"));
        assert!(!verify_password("pw", "sha256$$abc"));
    }
}
