use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hash cost: {0}")]
    InvalidCost(argon2::Error),

    #[error("password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),
}

/// Argon2 work factor. Defaults match the argon2 crate's recommended
/// parameters; raise them on faster hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted one-way password hasher.
#[derive(Clone)]
pub struct Hasher {
    argon2: Argon2<'static>,
}

impl Hasher {
    pub fn new(cost: HashCost) -> Result<Self, HashError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(HashError::InvalidCost)?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash with a fresh random salt. The same plaintext hashes differently
    /// on every call. An empty plaintext is accepted.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(HashError::Hashing)?;
        Ok(hash.to_string())
    }

    /// Check `plaintext` against a stored PHC string.
    ///
    /// Salt and cost are read from the stored hash, so hashes produced under an
    /// older cost still verify. The final comparison is constant-time. A stored
    /// value that does not parse never verifies.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Hasher {
        Hasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify("correct horse", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hasher = cheap();
        let hash = hasher.hash("pw2").unwrap();
        assert!(!hasher.verify("pw1", &hash));
    }

    #[test]
    fn salt_is_random() {
        let hasher = cheap();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn empty_password_is_valid() {
        let hasher = cheap();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash));
        assert!(!hasher.verify(" ", &hash));
    }

    #[test]
    fn hash_is_phc_encoded_and_not_plaintext() {
        let hasher = cheap();
        let hash = hasher.hash("plaintext-secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("plaintext-secret"));
    }

    #[test]
    fn verifies_hashes_made_under_other_cost() {
        let old = cheap();
        let hash = old.hash("pw").unwrap();

        let new = Hasher::new(HashCost {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(new.verify("pw", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = cheap();
        assert!(!hasher.verify("pw", "not-a-phc-string"));
        assert!(!hasher.verify("pw", ""));
    }

    #[test]
    fn rejects_impossible_cost() {
        let res = Hasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(res, Err(HashError::InvalidCost(_))));
    }
}
