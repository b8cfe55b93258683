// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

/// Error type for the textual forms (DN, alternative name, directory
/// attribute, OID list) accepted from profiles and subject requests.
///
/// Builders map these to [`crate::Error::InvalidSubject`] or
/// [`crate::Error::InvalidProfileConfiguration`] depending on where the
/// string came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("component {component:?} is missing '='")]
    MissingEquals { component: String },
    #[error("unknown DN attribute type {name:?}")]
    UnknownAttribute { name: String },
    #[error("empty value for {attribute}")]
    EmptyValue { attribute: String },
    #[error("unterminated quoted value")]
    UnterminatedQuote,
    #[error("dangling escape at end of input")]
    DanglingEscape,
    #[error("value {value:?} for {attribute} is not a valid {kind}")]
    InvalidString {
        attribute: String,
        value: String,
        kind: &'static str,
    },
    #[error("unknown alternative name type {name:?}")]
    UnknownAltName { name: String },
    #[error("invalid IP address {value:?}")]
    InvalidIpAddress { value: String },
    #[error("invalid object identifier {value:?}")]
    InvalidOid { value: String },
    #[error("unknown directory attribute {name:?}")]
    UnknownDirectoryAttribute { name: String },
    #[error("invalid {attribute} value {value:?}")]
    InvalidDirectoryAttribute { attribute: String, value: String },
    #[error("DER encoding error: {0}")]
    Der(#[from] der::Error),
}
