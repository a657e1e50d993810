// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-In With Ethereum (EIP-4361).
//!
//! Parsing, the validity window and EIP-191 signer recovery come from the
//! `siwe` crate. The domain and chain policy are ours: both must match the
//! server configuration. Nonces are tracked by the nonce repository.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use super::AuthError;

/// Parsed EIP-4361 message.
#[derive(Debug)]
pub struct SiweMessage(::siwe::Message);

impl FromStr for SiweMessage {
    type Err = AuthError;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        ::siwe::Message::from_str(message)
            .map(Self)
            .map_err(|e| AuthError::InvalidMessage(e.to_string()))
    }
}

impl SiweMessage {
    pub fn domain(&self) -> &str {
        self.0.domain.as_str()
    }

    /// Lower-cased `0x` address from the message.
    pub fn address(&self) -> String {
        format!("0x{}", alloy::hex::encode(self.0.address))
    }

    pub fn chain_id(&self) -> u64 {
        self.0.chain_id
    }

    pub fn nonce(&self) -> &str {
        &self.0.nonce
    }

    /// Check domain, chain and validity window.
    pub fn validate(
        &self,
        expected_domain: &str,
        expected_chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if !self.domain().eq_ignore_ascii_case(expected_domain) {
            return Err(AuthError::DomainMismatch);
        }
        if self.chain_id() != expected_chain_id {
            return Err(AuthError::ChainMismatch);
        }
        let now = OffsetDateTime::from_unix_timestamp(now.timestamp())
            .map_err(|e| AuthError::InternalError(format!("clock out of range: {e}")))?;
        if !self.0.valid_at(&now) {
            return Err(AuthError::MessageExpired);
        }
        Ok(())
    }
}

/// Verifies that a SIWE message was signed by the address it names.
pub trait SignatureVerifier: Send + Sync {
    /// Return the lower-cased signer address when `signature` is valid.
    fn verify(&self, message: &SiweMessage, signature: &str) -> Result<String, AuthError>;
}

/// EIP-191 personal-sign verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip191Verifier;

impl SignatureVerifier for Eip191Verifier {
    fn verify(&self, message: &SiweMessage, signature: &str) -> Result<String, AuthError> {
        let bytes = alloy::hex::decode(signature.trim())
            .map_err(|e| AuthError::InvalidMessage(format!("malformed signature: {e}")))?;
        let bytes: [u8; 65] = bytes.try_into().map_err(|_| {
            AuthError::InvalidMessage("malformed signature: expected 65 bytes".to_string())
        })?;

        message.0.verify_eip191(&bytes).map_err(|e| match e {
            ::siwe::VerificationError::Signer => AuthError::SignerMismatch,
            other => AuthError::InvalidMessage(format!("malformed signature: {other}")),
        })?;
        Ok(message.address())
    }
}

/// Generate a fresh alphanumeric nonce.
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};
    use chrono::{Duration, TimeZone};

    pub(crate) fn test_signer() -> PrivateKeySigner {
        PrivateKeySigner::from_slice(&[0x11; 32]).unwrap()
    }

    /// EIP-55 checksummed address of [`test_signer`].
    pub(crate) fn test_address() -> String {
        test_signer().address().to_checksum(None)
    }

    pub(crate) fn build_message(domain: &str, address: &str, chain_id: u64, nonce: &str) -> String {
        format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             Sign in to Paylink\n\
             \n\
             URI: http://{domain}\n\
             Version: 1\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: 2026-01-01T00:00:00Z"
        )
    }

    pub(crate) fn sign(message: &str) -> String {
        let signature = test_signer().sign_message_sync(message.as_bytes()).unwrap();
        format!("0x{}", alloy::hex::encode(signature.as_bytes()))
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_full_message() {
        let message = format!(
            "{}\nExpiration Time: 2026-01-02T00:00:00Z\nRequest ID: req-1",
            build_message("localhost:3000", &test_address(), 84532, "abcdef123456")
        );
        let parsed: SiweMessage = message.parse().unwrap();
        assert_eq!(parsed.domain(), "localhost:3000");
        assert_eq!(parsed.address(), test_address().to_ascii_lowercase());
        assert_eq!(parsed.chain_id(), 84532);
        assert_eq!(parsed.nonce(), "abcdef123456");
    }

    #[test]
    fn rejects_malformed_messages() {
        let address = "0x0000000000000000000000000000000000000001";
        assert!("hello".parse::<SiweMessage>().is_err());

        let bad_chain = build_message("localhost:3000", address, 1, "abcdef123456")
            .replace("Chain ID: 1", "Chain ID: one");
        assert!(bad_chain.parse::<SiweMessage>().is_err());

        let bad_address = build_message("localhost:3000", "0x123", 1, "abcdef123456");
        assert!(bad_address.parse::<SiweMessage>().is_err());

        let err = "hello".parse::<SiweMessage>().unwrap_err();
        assert!(matches!(err, AuthError::InvalidMessage(_)));
    }

    #[test]
    fn validates_domain_chain_and_window() {
        let message = format!(
            "{}\nExpiration Time: 2026-01-02T00:00:00Z",
            build_message("localhost:3000", &test_address(), 84532, "abcdef123456")
        );
        let parsed: SiweMessage = message.parse().unwrap();
        let now = issued_at() + Duration::hours(1);

        assert_eq!(parsed.validate("localhost:3000", 84532, now), Ok(()));
        assert_eq!(
            parsed.validate("evil.example", 84532, now),
            Err(AuthError::DomainMismatch)
        );
        assert_eq!(
            parsed.validate("localhost:3000", 8453, now),
            Err(AuthError::ChainMismatch)
        );
        assert_eq!(
            parsed.validate("localhost:3000", 84532, now + Duration::days(2)),
            Err(AuthError::MessageExpired)
        );
    }

    #[test]
    fn not_before_is_enforced() {
        let message = format!(
            "{}\nNot Before: 2026-01-01T12:00:00Z",
            build_message("localhost:3000", &test_address(), 84532, "abcdef123456")
        );
        let parsed: SiweMessage = message.parse().unwrap();

        assert_eq!(
            parsed.validate("localhost:3000", 84532, issued_at() + Duration::hours(1)),
            Err(AuthError::MessageExpired)
        );
        assert_eq!(
            parsed.validate("localhost:3000", 84532, issued_at() + Duration::hours(13)),
            Ok(())
        );
    }

    #[test]
    fn verifies_signer() {
        let message = build_message("localhost:3000", &test_address(), 84532, "abcdef123456");
        let parsed: SiweMessage = message.parse().unwrap();

        let signer = Eip191Verifier.verify(&parsed, &sign(&message)).unwrap();
        assert_eq!(signer, test_address().to_ascii_lowercase());
    }

    #[test]
    fn signature_over_other_text_is_a_signer_mismatch() {
        let message = build_message("localhost:3000", &test_address(), 84532, "abcdef123456");
        let parsed: SiweMessage = message.parse().unwrap();

        assert_eq!(
            Eip191Verifier.verify(&parsed, &sign("different message")),
            Err(AuthError::SignerMismatch)
        );
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let message = build_message("localhost:3000", &test_address(), 84532, "abcdef123456");
        let parsed: SiweMessage = message.parse().unwrap();

        for signature in ["0x1234", "not hex", ""] {
            assert!(matches!(
                Eip191Verifier.verify(&parsed, signature),
                Err(AuthError::InvalidMessage(_))
            ));
        }
    }

    #[test]
    fn nonces_are_alphanumeric_and_unique() {
        let a = generate_nonce();
        assert!(a.len() >= 8);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, generate_nonce());
    }
}
