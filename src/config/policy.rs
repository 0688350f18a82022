//! Colon-separated algorithm policy strings.
//!
//! ```text
//! "TLS_AES_128_GCM_SHA256:TLS_CHACHA20_POLY1305_SHA256"
//! "ECDSA+SHA256:Ed25519"
//! "X25519:P-256"
//! ```
//!
//! Order is preference order. Unknown names and empty lists are rejected;
//! repeated names are kept once.

use alloc::vec::Vec;

use crate::crypto::NamedGroup;
use crate::error::{Error, Result};
use crate::pki::SignatureScheme;
use crate::tls::CipherSuite;

fn parse_list<T: PartialEq>(
    policy: &str,
    what: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for name in policy.split(':').map(str::trim).filter(|n| !n.is_empty()) {
        let item = parse(name).ok_or(Error::Config(what))?;
        if !out.contains(&item) {
            out.push(item);
        }
    }
    if out.is_empty() {
        return Err(Error::Config(what));
    }
    Ok(out)
}

pub fn parse_cipher_suites(policy: &str) -> Result<Vec<CipherSuite>> {
    parse_list(policy, "cipher suite policy", CipherSuite::from_name)
}

pub fn parse_signature_schemes(policy: &str) -> Result<Vec<SignatureScheme>> {
    parse_list(policy, "signature algorithm policy", |name| match name {
        "ECDSA+SHA256" => Some(SignatureScheme::EcdsaSecp256r1Sha256),
        "Ed25519" => Some(SignatureScheme::Ed25519),
        _ => None,
    })
}

pub fn parse_named_groups(policy: &str) -> Result<Vec<NamedGroup>> {
    parse_list(policy, "named group policy", |name| match name {
        "X25519" => Some(NamedGroup::X25519),
        "P-256" | "secp256r1" => Some(NamedGroup::Secp256r1),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suites_in_order() {
        assert_eq!(
            parse_cipher_suites("TLS_CHACHA20_POLY1305_SHA256:TLS_AES_256_GCM_SHA384").unwrap(),
            [
                CipherSuite::TlsChacha20Poly1305Sha256,
                CipherSuite::TlsAes256GcmSha384
            ]
        );
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(
            parse_named_groups("X25519:P-256:X25519").unwrap(),
            [NamedGroup::X25519, NamedGroup::Secp256r1]
        );
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert_eq!(
            parse_signature_schemes("ECDSA+SHA256:RSA+SHA1"),
            Err(Error::Config("signature algorithm policy"))
        );
        assert_eq!(parse_named_groups(""), Err(Error::Config("named group policy")));
        assert_eq!(parse_cipher_suites("::"), Err(Error::Config("cipher suite policy")));
    }

    #[test]
    fn signature_names() {
        assert_eq!(
            parse_signature_schemes("Ed25519:ECDSA+SHA256").unwrap(),
            [SignatureScheme::Ed25519, SignatureScheme::EcdsaSecp256r1Sha256]
        );
    }
}
