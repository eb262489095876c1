use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use tokio::task;

use crate::{Error, Result};

/// Argon2id memory cost in KiB (64 MB)
const M_COST: u32 = 65536;
/// Argon2id iterations
const T_COST: u32 = 3;
/// Argon2id lanes
const P_COST: u32 = 4;
/// Hash output length in bytes
const OUTPUT_LEN: usize = 32;

fn argon2id() -> Result<Argon2<'static>> {
    let params = ParamsBuilder::new()
        .m_cost(M_COST)
        .t_cost(T_COST)
        .p_cost(P_COST)
        .output_len(OUTPUT_LEN)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build Argon2 params: {e}")))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string using Argon2id
///
/// CPU-intensive; runs on a blocking thread.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = argon2id()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))?
            .to_string();

        Ok(password_hash)
    })
    .await
    .map_err(|e| Error::Internal(format!("Password hashing task failed: {e}")))?
}

/// Verify a password against a stored PHC hash
///
/// Parameters are read from the hash itself. CPU-intensive; runs on a
/// blocking thread.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)
            .map_err(|e| Error::Internal(format!("Invalid password hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("Password verification failed: {e}"))),
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("Password verification task failed: {e}")))?
}
