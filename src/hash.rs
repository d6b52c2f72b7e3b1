//! Digest helper for building cache keys and file names.

use crate::error::{Error, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Algorithm used by [`hash_default`].
pub const DEFAULT_ALGORITHM: &str = "sha1";

/// Hex digest of `input` using the algorithm named by `algorithm`.
///
/// Both arguments are trimmed; the algorithm name is case-insensitive.
///
/// # Errors
///
/// `Error::UnsupportedAlgorithm` for names other than `md5`, `sha1`,
/// `sha224`, `sha256`, `sha384` and `sha512`.
pub fn hash(input: &str, algorithm: &str) -> Result<String> {
    let input = input.trim().as_bytes();
    let algorithm = algorithm.trim().to_ascii_lowercase();

    let digest = match algorithm.as_str() {
        "md5" => hex::encode(Md5::digest(input)),
        "sha1" => hex::encode(Sha1::digest(input)),
        "sha224" => hex::encode(Sha224::digest(input)),
        "sha256" => hex::encode(Sha256::digest(input)),
        "sha384" => hex::encode(Sha384::digest(input)),
        "sha512" => hex::encode(Sha512::digest(input)),
        _ => return Err(Error::UnsupportedAlgorithm(algorithm)),
    };

    Ok(digest)
}

/// [`hash`] with [`DEFAULT_ALGORITHM`].
pub fn hash_default(input: &str) -> String {
    hex::encode(Sha1::digest(input.trim().as_bytes()))
}
