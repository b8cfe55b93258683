// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::token::KeyPurpose;
use std::fmt::Display;
use thiserror::Error;

/// Result type used by all engine APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type used by all engine APIs.
///
/// A failed build never yields partial output: every builder either returns
/// the complete, self-verified DER or one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Key material for the requested purpose is unreachable. Retrying is up
    /// to the caller once the token is back online.
    #[error("CA token offline: no usable {purpose} key")]
    TokenOffline { purpose: KeyPurpose },
    /// The token holds the key but the cryptographic operation itself failed.
    #[error("CA token {purpose} operation failed: {details}")]
    TokenOperation {
        purpose: KeyPurpose,
        details: String,
    },
    /// Profile or CA configuration contains a malformed value.
    #[error("invalid profile configuration: {details}")]
    InvalidProfileConfiguration { details: String },
    /// Per-issuance subject data cannot be used.
    #[error("invalid subject request: {details}")]
    InvalidSubject { details: String },
    /// The signer certificate attached to a CA cannot be decoded.
    #[error("invalid CA certificate: {details}")]
    InvalidCaCertificate { details: String },
    /// A freshly signed structure failed verification against the signer.
    #[error("integrity check failed: {details}")]
    Integrity { details: String },
    /// Key recovery wrap/unwrap failure.
    #[error("key recovery failed: {details}")]
    KeyRecoveryDecode { details: String },
    /// Serial number generation failed.
    #[error("failed to generate serial number: {details}")]
    SerialGeneration { details: String },
    /// Configuration document could not be read or parsed.
    #[error("configuration error: {details}")]
    Config { details: String },
    #[error(transparent)]
    Der(#[from] der::Error),
    #[error(transparent)]
    Oid(#[from] const_oid::Error),
}

impl Error {
    pub(crate) fn invalid_profile(details: impl Display) -> Self {
        Error::InvalidProfileConfiguration {
            details: details.to_string(),
        }
    }

    pub(crate) fn invalid_subject(details: impl Display) -> Self {
        Error::InvalidSubject {
            details: details.to_string(),
        }
    }

    pub(crate) fn integrity(details: impl Display) -> Self {
        Error::Integrity {
            details: details.to_string(),
        }
    }

    pub(crate) fn recovery(details: impl Display) -> Self {
        Error::KeyRecoveryDecode {
            details: details.to_string(),
        }
    }

    /// Reports whether the error is the transient offline-token condition.
    pub fn is_token_offline(&self) -> bool {
        matches!(self, Error::TokenOffline { .. })
    }
}
