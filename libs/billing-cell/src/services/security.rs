use argon2::password_hash::{rand_core::OsRng, Output, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use tracing::{instrument, warn};

use crate::models::BillingError;

/// Hash and salt stored alongside a bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillSeal {
    pub hash: String,
    pub salt: String,
}

/// Keyed Argon2id digests over bill file contents.
#[derive(Clone)]
pub struct BillSecurity {
    secret: Vec<u8>,
    params: Params,
}

impl BillSecurity {
    pub fn new(secret: &str) -> Self {
        Self::with_params(secret, Params::default())
    }

    pub fn with_params(secret: &str, params: Params) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            params,
        }
    }

    fn hasher(&self) -> Result<Argon2<'_>, argon2::Error> {
        if self.secret.is_empty() {
            return Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone()));
        }
        Argon2::new_with_secret(&self.secret, Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn digest(&self, content: &str, salt: &SaltString) -> Result<Output, BillingError> {
        let argon2 = self
            .hasher()
            .map_err(|e| BillingError::Integrity(e.to_string()))?;
        let hashed = argon2
            .hash_password(content.as_bytes(), salt)
            .map_err(|e| BillingError::Integrity(e.to_string()))?;
        hashed
            .hash
            .ok_or_else(|| BillingError::Integrity("hash output missing".to_string()))
    }

    #[instrument(skip(self, content))]
    pub fn seal(&self, content: &str) -> Result<BillSeal, BillingError> {
        let salt = SaltString::generate(&mut OsRng);
        let output = self.digest(content, &salt)?;
        Ok(BillSeal {
            hash: output.to_string(),
            salt: salt.as_str().to_string(),
        })
    }

    /// False when the content no longer matches, or when the stored seal is unreadable.
    #[instrument(skip(self, content, seal))]
    pub fn verify(&self, content: &str, seal: &BillSeal) -> bool {
        let salt = match SaltString::from_b64(&seal.salt) {
            Ok(salt) => salt,
            Err(e) => {
                warn!("Stored bill salt is malformed: {}", e);
                return false;
            }
        };
        let expected = match Output::b64_decode(&seal.hash) {
            Ok(output) => output,
            Err(e) => {
                warn!("Stored bill hash is malformed: {}", e);
                return false;
            }
        };

        match self.digest(content, &salt) {
            Ok(actual) => actual == expected,
            Err(e) => {
                warn!("Could not recompute bill hash: {}", e);
                false
            }
        }
    }
}
