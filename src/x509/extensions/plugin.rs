// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Numbered certificate extension plugins.
//!
//! A profile names its plugins by id; the ids are looked up once, when the
//! profile is resolved against a registry, so issuance never dispatches on
//! numbers.

use crate::config::{CaConfiguration, CertificateProfile, ParsedProfile};
use crate::error::{Error, Result};
use crate::x509::SubjectRequest;
use const_oid::ObjectIdentifier;
use der::Encode;
use der::asn1::{Any, Ia5String, Null, OctetString, PrintableString, Utf8StringRef};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A custom extension contributed to every certificate of a profile.
pub trait CertificateExtension: Send + Sync {
    /// Extension identifier.
    fn oid(&self) -> ObjectIdentifier;

    /// Whether the extension is marked critical.
    fn critical(&self) -> bool;

    /// Computes the DER encoded extension value (the contents of extnValue).
    fn value(
        &self,
        request: &SubjectRequest,
        ca: &CaConfiguration,
        profile: &CertificateProfile,
    ) -> Result<Vec<u8>>;
}

/// Value encodings available to [`BasicCertificateExtension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    Utf8String,
    Ia5String,
    PrintableString,
    Integer,
    Boolean,
    Null,
    /// Hex encoded contents of an OCTET STRING.
    OctetString,
    /// Hex encoded DER, used as is.
    Raw,
}

/// A static extension value configured as text.
#[derive(Clone, Debug)]
pub struct BasicCertificateExtension {
    oid: ObjectIdentifier,
    critical: bool,
    der: Vec<u8>,
}

impl BasicCertificateExtension {
    /// Encodes `value` once; a value that does not fit its encoding is a
    /// configuration error.
    pub fn new(
        oid: ObjectIdentifier,
        critical: bool,
        encoding: ValueEncoding,
        value: &str,
    ) -> Result<Self> {
        let invalid = || Error::invalid_profile(format!("extension {oid}: invalid {encoding:?} value {value:?}"));
        let der = match encoding {
            ValueEncoding::Utf8String => Utf8StringRef::new(value)?.to_der()?,
            ValueEncoding::Ia5String => Ia5String::new(value).map_err(|_| invalid())?.to_der()?,
            ValueEncoding::PrintableString => {
                PrintableString::new(value).map_err(|_| invalid())?.to_der()?
            }
            ValueEncoding::Integer => value.trim().parse::<i64>().map_err(|_| invalid())?.to_der()?,
            ValueEncoding::Boolean => value.trim().parse::<bool>().map_err(|_| invalid())?.to_der()?,
            ValueEncoding::Null => Null.to_der()?,
            ValueEncoding::OctetString => {
                let bytes = hex::decode(value.trim()).map_err(|_| invalid())?;
                OctetString::new(bytes)?.to_der()?
            }
            ValueEncoding::Raw => {
                let bytes = hex::decode(value.trim()).map_err(|_| invalid())?;
                // Must be exactly one well formed TLV
                let any = <Any as der::Decode>::from_der(&bytes).map_err(|_| invalid())?;
                any.to_der()?
            }
        };
        Ok(Self { oid, critical, der })
    }
}

impl CertificateExtension for BasicCertificateExtension {
    fn oid(&self) -> ObjectIdentifier {
        self.oid
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(
        &self,
        _request: &SubjectRequest,
        _ca: &CaConfiguration,
        _profile: &CertificateProfile,
    ) -> Result<Vec<u8>> {
        Ok(self.der.clone())
    }
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    extension: Vec<ExtensionEntry>,
}

#[derive(Deserialize)]
struct ExtensionEntry {
    id: u32,
    oid: String,
    #[serde(default)]
    critical: bool,
    encoding: ValueEncoding,
    #[serde(default)]
    value: String,
}

/// Table of available extension plugins, keyed by numeric id.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    plugins: BTreeMap<u32, Arc<dyn CertificateExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads [`BasicCertificateExtension`]s from `[[extension]]` tables:
    ///
    /// ```toml
    /// [[extension]]
    /// id = 1
    /// oid = "1.2.3.4"
    /// critical = false
    /// encoding = "utf8string"
    /// value = "hello"
    /// ```
    pub fn from_toml(text: &str) -> Result<Self> {
        let doc: RegistryDocument = toml::from_str(text).map_err(|e| Error::Config {
            details: e.to_string(),
        })?;
        let mut registry = Self::new();
        for entry in doc.extension {
            let oid = ObjectIdentifier::new(entry.oid.trim()).map_err(|e| {
                Error::invalid_profile(format!("extension {}: OID {:?}: {e}", entry.id, entry.oid))
            })?;
            let plugin =
                BasicCertificateExtension::new(oid, entry.critical, entry.encoding, &entry.value)?;
            registry.register(entry.id, Arc::new(plugin))?;
        }
        Ok(registry)
    }

    /// Adds a plugin under `id`. Ids are unique.
    pub fn register(&mut self, id: u32, plugin: Arc<dyn CertificateExtension>) -> Result<()> {
        if self.plugins.contains_key(&id) {
            return Err(Error::invalid_profile(format!(
                "extension id {id} registered twice"
            )));
        }
        self.plugins.insert(id, plugin);
        Ok(())
    }

    /// Looks up a plugin by id.
    pub fn get(&self, id: u32) -> Option<&Arc<dyn CertificateExtension>> {
        self.plugins.get(&id)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Validates `profile` and binds its plugin ids to their implementations.
    pub fn resolve(&self, profile: CertificateProfile) -> Result<ResolvedProfile> {
        let parsed = profile.parse()?;
        let plugins = profile
            .certificate_extensions
            .iter()
            .map(|id| {
                self.plugins.get(id).cloned().ok_or_else(|| {
                    Error::invalid_profile(format!(
                        "profile {:?} references unknown extension id {id}",
                        profile.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(profile = %profile.name, plugins = plugins.len(), "resolved certificate profile");
        Ok(ResolvedProfile {
            profile,
            parsed,
            plugins,
        })
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.plugins.iter().map(|(id, p)| (id, p.oid())))
            .finish()
    }
}

/// A validated profile with its string fields parsed and its plugins bound.
/// This is what the certificate builder consumes.
#[derive(Clone)]
pub struct ResolvedProfile {
    pub(crate) profile: CertificateProfile,
    pub(crate) parsed: ParsedProfile,
    pub(crate) plugins: Vec<Arc<dyn CertificateExtension>>,
}

impl ResolvedProfile {
    /// Resolves a profile that references no plugins.
    pub fn new(profile: CertificateProfile) -> Result<Self> {
        ExtensionRegistry::default().resolve(profile)
    }

    /// Returns the underlying profile.
    pub fn profile(&self) -> &CertificateProfile {
        &self.profile
    }
}

impl fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("profile", &self.profile.name)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.oid()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
