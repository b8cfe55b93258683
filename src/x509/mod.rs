// caforge: certificate authority engine
// Copyright 2025 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! X.509 certificate and CRL construction.
//!
//! https://datatracker.ietf.org/doc/html/rfc5280
//!
//! Certificates are built from a [`SubjectRequest`], a [`ResolvedProfile`]
//! and a [`CaConfiguration`](crate::config::CaConfiguration), signed through
//! a [`CaSigningKey`](crate::token::CaSigningKey) and verified against the
//! signer's public key before they are handed out. CRLs follow the same path.

pub mod altname;
mod crl;
mod error;
mod extensions;
mod issue;
pub mod name;
pub mod oid;
mod serial;
mod types;
mod validity;
pub(crate) mod verify;

pub use altname::{AltName, AltNameKind, AltNames};
pub use crl::{build_crl, build_crl_at};
pub use error::ParseError;
pub use extensions::{
    BasicCertificateExtension, CertificateExtension, ExtensionRegistry, ResolvedProfile,
    ValueEncoding,
};
pub use issue::{build_certificate, build_certificate_at};
pub use name::{DistinguishedName, DnEncoding, NameAttribute};
pub use serial::SerialNumberAllocator;
pub use types::{
    ExtendedInformation, GeneratedCertificate, GeneratedCrl, IssuerCertificate, RevocationEntry,
    RevocationReason, SubjectRequest,
};
pub use validity::{CLOCK_SKEW_MARGIN, ValidityWindow, resolve_validity};
pub use verify::{verify_certificate_der, verify_crl_der};

use crate::error::Result;
use const_oid::ObjectIdentifier;
use der::Encode;
use der::asn1::OctetString;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_cert::ext::Extension;
use x509_cert::serial_number::SerialNumber;

/// Wraps the DER encoding of `value` into an extension.
pub(crate) fn make_extension(
    oid: ObjectIdentifier,
    critical: bool,
    value: &impl Encode,
) -> Result<Extension> {
    Ok(Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value.to_der()?)?,
    })
}

/// Current time in UNIX seconds.
pub(crate) fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Hex form of a serial number, for logs.
pub(crate) fn serial_hex(serial: &SerialNumber) -> String {
    hex::encode(serial.as_bytes())
}
