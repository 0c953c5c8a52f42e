//! Helpers for bearer credentials wrapped in [`Secret`].

use {
    secrecy::{ExposeSecret, Secret},
    sha2::{Digest, Sha256},
};

/// Serialize an `Option<Secret<String>>` by exposing its inner value.
/// Only for fields that must round-trip through the token file.
pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Short, stable, non-reversible tag for a credential.
///
/// Eight hex characters of its SHA-256, so logs can tell two tokens apart
/// (e.g. across a refresh-token rotation) without carrying either of them.
pub fn fingerprint(secret: &Secret<String>) -> String {
    let digest = Sha256::digest(secret.expose_secret().as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Slots {
        #[serde(serialize_with = "serialize_option_secret")]
        access: Option<Secret<String>>,
        #[serde(serialize_with = "serialize_option_secret")]
        refresh: Option<Secret<String>>,
    }

    #[test]
    fn serializes_exposed_values() {
        let slots = Slots {
            access: Some(Secret::new("at-1".into())),
            refresh: None,
        };
        let json = serde_json::to_string(&slots).unwrap();
        assert_eq!(json, r#"{"access":"at-1","refresh":null}"#);
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = Secret::new("refresh-a".to_string());
        let b = Secret::new("refresh-b".to_string());
        assert_eq!(fingerprint(&a), fingerprint(&a));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 8);
        assert!(!fingerprint(&a).contains("refresh"));
    }
}
