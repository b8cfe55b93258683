// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Typed CA and certificate profile configuration.
//!
//! Both documents are plain TOML. Every string that needs parsing (DNs, OID
//! lists, distribution points) is checked when the document is loaded, so a
//! configuration that loads cleanly cannot fail issuance on syntax alone.

mod ca;
mod profile;

pub use ca::{CaCertificate, CaConfiguration};
pub use profile::{
    CertificateProfile, KeyUsageBit, ProfileType, QcStatementSettings, key_usage_flags,
};
pub(crate) use profile::ParsedProfile;

pub use crate::x509::altname::AltNameKind;
pub use crate::x509::name::DnEncoding;

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

fn from_toml<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::Config {
        details: e.to_string(),
    })
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Config {
        details: format!("{}: {e}", path.display()),
    })
}

/// Splits a `;` separated list, dropping blanks.
pub(crate) fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty())
}
