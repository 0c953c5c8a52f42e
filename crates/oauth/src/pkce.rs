//! PKCE verifier and S256 challenge generation (RFC 7636).

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::RngCore,
    sha2::{Digest, Sha256},
};

use crate::{Error, Result, types::PkceChallenge};

/// Characters a verifier is drawn from.
pub const VERIFIER_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const MIN_VERIFIER_LEN: usize = 43;
pub const MAX_VERIFIER_LEN: usize = 128;

/// Length used for every verifier the redirector creates.
pub const DEFAULT_VERIFIER_LEN: usize = MAX_VERIFIER_LEN;

/// Generate a verifier of exactly `length` alphanumeric characters.
///
/// Each byte from the OS CSPRNG maps to `VERIFIER_ALPHABET[b % 62]`.
pub fn generate_verifier(length: usize) -> Result<String> {
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&length) {
        return Err(Error::InvalidVerifierLength(length));
    }
    Ok(random_verifier(length))
}

/// `base64url(SHA-256(verifier))` without padding.
pub fn generate_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Fresh verifier of [`DEFAULT_VERIFIER_LEN`] with its challenge.
pub fn generate_pkce() -> PkceChallenge {
    let verifier = random_verifier(DEFAULT_VERIFIER_LEN);
    let challenge = generate_challenge(&verifier);
    PkceChallenge {
        verifier,
        challenge,
    }
}

fn random_verifier(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill_bytes(&mut bytes);
    bytes
        .into_iter()
        .map(|b| char::from(VERIFIER_ALPHABET[usize::from(b) % VERIFIER_ALPHABET.len()]))
        .collect()
}
