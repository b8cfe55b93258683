// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::ParseError;
use super::name::{DistinguishedName, DnEncoding, split_unescaped, unescape};
use const_oid::ObjectIdentifier;
use der::asn1::{Ia5String, OctetString};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use x509_cert::ext::pkix::name::GeneralName;

/// Alternative name kinds accepted in the textual form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltNameKind {
    Rfc822Name,
    DnsName,
    Uri,
    IpAddress,
    DirectoryName,
    RegisteredId,
}

impl AltNameKind {
    fn from_label(label: &str) -> Option<Self> {
        let kind = match label.trim().to_ascii_lowercase().as_str() {
            "rfc822name" | "email" => AltNameKind::Rfc822Name,
            "dnsname" | "dns" => AltNameKind::DnsName,
            "uri" | "uniformresourceidentifier" | "uniformresourceid" => AltNameKind::Uri,
            "ipaddress" | "ip" => AltNameKind::IpAddress,
            "directoryname" | "dirname" => AltNameKind::DirectoryName,
            "registeredid" => AltNameKind::RegisteredId,
            _ => return None,
        };
        Some(kind)
    }
}

/// One `kind=value` alternative name entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AltName {
    pub kind: AltNameKind,
    pub value: String,
}

impl AltName {
    /// Encodes the entry as a GeneralName. Directory names are encoded with
    /// the given DN string mode.
    pub fn to_general_name(&self, encoding: DnEncoding) -> Result<GeneralName, ParseError> {
        let name = match self.kind {
            AltNameKind::Rfc822Name => GeneralName::Rfc822Name(ia5(&self.value, "rfc822Name")?),
            AltNameKind::DnsName => GeneralName::DnsName(ia5(&self.value, "dNSName")?),
            AltNameKind::Uri => {
                GeneralName::UniformResourceIdentifier(ia5(&self.value, "uniformResourceIdentifier")?)
            }
            AltNameKind::IpAddress => {
                let ip: IpAddr =
                    self.value
                        .trim()
                        .parse()
                        .map_err(|_| ParseError::InvalidIpAddress {
                            value: self.value.clone(),
                        })?;
                let octets = match ip {
                    IpAddr::V4(v4) => v4.octets().to_vec(),
                    IpAddr::V6(v6) => v6.octets().to_vec(),
                };
                GeneralName::IpAddress(OctetString::new(octets)?)
            }
            AltNameKind::DirectoryName => {
                GeneralName::DirectoryName(DistinguishedName::parse(&self.value)?.to_name(encoding)?)
            }
            AltNameKind::RegisteredId => GeneralName::RegisteredId(
                ObjectIdentifier::new(self.value.trim()).map_err(|_| ParseError::InvalidOid {
                    value: self.value.clone(),
                })?,
            ),
        };
        Ok(name)
    }
}

fn ia5(value: &str, kind: &'static str) -> Result<Ia5String, ParseError> {
    if !value.is_ascii() {
        return Err(ParseError::InvalidString {
            attribute: kind.to_string(),
            value: value.to_string(),
            kind: "IA5String",
        });
    }
    Ok(Ia5String::new(value)?)
}

/// Ordered list of alternative names, parsed from the comma separated
/// `dnsName=a.example, rfc822Name=x@example, directoryName=CN=X\,O=Y` form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AltNames(pub Vec<AltName>);

impl AltNames {
    /// Parses the textual form. An empty string yields no names.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut names = Vec::new();
        for component in split_unescaped(input, ',')? {
            if component.trim().is_empty() {
                continue;
            }
            let (label, raw) = component
                .split_once('=')
                .ok_or_else(|| ParseError::MissingEquals {
                    component: component.clone(),
                })?;
            let kind = AltNameKind::from_label(label).ok_or_else(|| ParseError::UnknownAltName {
                name: label.trim().to_string(),
            })?;
            let value = unescape(raw)?;
            if value.is_empty() {
                return Err(ParseError::EmptyValue {
                    attribute: label.trim().to_string(),
                });
            }
            names.push(AltName { kind, value });
        }
        Ok(Self(names))
    }

    /// Reports whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops every entry whose kind is not listed.
    pub fn retain_kinds(&mut self, keep: &[AltNameKind]) {
        self.0.retain(|n| keep.contains(&n.kind));
    }

    /// Encodes every entry as a GeneralName, preserving order.
    pub fn to_general_names(&self, encoding: DnEncoding) -> Result<Vec<GeneralName>, ParseError> {
        self.0.iter().map(|n| n.to_general_name(encoding)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Verifies parsing of every supported kind in order.
    #[test]
    fn test_parse_all_kinds() {
        let names = AltNames::parse(
            "dnsName=a.example, rfc822Name=x@example.com,uri=http://a/,ipAddress=10.0.0.1,\
             ipaddress=::1,directoryName=CN=X\\,O=Y,registeredID=1.2.3.4",
        )
        .unwrap();
        let kinds: Vec<_> = names.0.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            [
                AltNameKind::DnsName,
                AltNameKind::Rfc822Name,
                AltNameKind::Uri,
                AltNameKind::IpAddress,
                AltNameKind::IpAddress,
                AltNameKind::DirectoryName,
                AltNameKind::RegisteredId,
            ]
        );
        assert_eq!(names.0[5].value, "CN=X,O=Y");

        let general = names.to_general_names(DnEncoding::Utf8).unwrap();
        assert!(matches!(&general[3], GeneralName::IpAddress(ip) if ip.as_bytes() == [10, 0, 0, 1]));
        assert!(matches!(&general[4], GeneralName::IpAddress(ip) if ip.as_bytes().len() == 16));
        assert!(matches!(&general[5], GeneralName::DirectoryName(dn) if dn.0.len() == 2));
    }

    /// Verifies that malformed entries are rejected.
    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            AltNames::parse("foo=bar"),
            Err(ParseError::UnknownAltName { .. })
        ));
        assert!(matches!(
            AltNames::parse("dnsName"),
            Err(ParseError::MissingEquals { .. })
        ));
        let names = AltNames::parse("ipAddress=10.0.0.300").unwrap();
        assert!(matches!(
            names.to_general_names(DnEncoding::Utf8),
            Err(ParseError::InvalidIpAddress { .. })
        ));
        let names = AltNames::parse("dnsName=bücher.example").unwrap();
        assert!(names.to_general_names(DnEncoding::Utf8).is_err());
    }

    /// Verifies the subset transform keeps order.
    #[test]
    fn test_retain_kinds() {
        let mut names = AltNames::parse("dnsName=a,email=b@c,dnsName=d").unwrap();
        names.retain_kinds(&[AltNameKind::DnsName]);
        let values: Vec<_> = names.0.iter().map(|n| n.value.as_str()).collect();
        assert_eq!(values, ["a", "d"]);
    }
}
