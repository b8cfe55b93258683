// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::ParseError;
use super::oid;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, SetOfVec};
use serde::{Deserialize, Serialize};
use std::fmt;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

/// String type used for DN attribute values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnEncoding {
    /// UTF8String, except for attributes whose syntax mandates otherwise.
    #[default]
    Utf8,
    /// PrintableString wherever the value allows it.
    Printable,
}

/// ASN.1 string syntax an attribute is pinned to regardless of encoding mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Syntax {
    Directory,
    Printable,
    Ia5,
}

struct AttributeType {
    names: &'static [&'static str],
    oid: ObjectIdentifier,
    syntax: Syntax,
}

#[rustfmt::skip]
const ATTRIBUTE_TYPES: &[AttributeType] = &[
    AttributeType { names: &["CN", "COMMONNAME"], oid: oid::AT_COMMON_NAME, syntax: Syntax::Directory },
    AttributeType { names: &["SN", "SERIALNUMBER"], oid: oid::AT_SERIAL_NUMBER, syntax: Syntax::Printable },
    AttributeType { names: &["C", "COUNTRY"], oid: oid::AT_COUNTRY, syntax: Syntax::Printable },
    AttributeType { names: &["L", "LOCALITY"], oid: oid::AT_LOCALITY, syntax: Syntax::Directory },
    AttributeType { names: &["ST", "STATE"], oid: oid::AT_STATE, syntax: Syntax::Directory },
    AttributeType { names: &["STREET"], oid: oid::AT_STREET, syntax: Syntax::Directory },
    AttributeType { names: &["O", "ORGANIZATION"], oid: oid::AT_ORGANIZATION, syntax: Syntax::Directory },
    AttributeType { names: &["OU", "ORGANIZATIONALUNIT"], oid: oid::AT_ORGANIZATIONAL_UNIT, syntax: Syntax::Directory },
    AttributeType { names: &["T", "TITLE"], oid: oid::AT_TITLE, syntax: Syntax::Directory },
    AttributeType { names: &["POSTALCODE"], oid: oid::AT_POSTAL_CODE, syntax: Syntax::Directory },
    AttributeType { names: &["SURNAME"], oid: oid::AT_SURNAME, syntax: Syntax::Directory },
    AttributeType { names: &["GIVENNAME"], oid: oid::AT_GIVEN_NAME, syntax: Syntax::Directory },
    AttributeType { names: &["INITIALS"], oid: oid::AT_INITIALS, syntax: Syntax::Directory },
    AttributeType { names: &["GENERATIONQUALIFIER"], oid: oid::AT_GENERATION_QUALIFIER, syntax: Syntax::Directory },
    AttributeType { names: &["DNQUALIFIER"], oid: oid::AT_DN_QUALIFIER, syntax: Syntax::Printable },
    AttributeType { names: &["PSEUDONYM"], oid: oid::AT_PSEUDONYM, syntax: Syntax::Directory },
    AttributeType { names: &["DC"], oid: oid::AT_DOMAIN_COMPONENT, syntax: Syntax::Ia5 },
    AttributeType { names: &["UID"], oid: oid::AT_USER_ID, syntax: Syntax::Directory },
    AttributeType { names: &["E", "EMAILADDRESS", "EMAIL"], oid: oid::AT_EMAIL_ADDRESS, syntax: Syntax::Ia5 },
];

fn lookup_by_name(name: &str) -> Option<&'static AttributeType> {
    ATTRIBUTE_TYPES
        .iter()
        .find(|t| t.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
}

fn lookup_by_oid(oid: &ObjectIdentifier) -> Option<&'static AttributeType> {
    ATTRIBUTE_TYPES.iter().find(|t| t.oid == *oid)
}

/// Resolves an attribute type label (`CN`, `emailAddress`, `2.5.4.3`,
/// `OID.2.5.4.3`) to its OID.
pub fn attribute_oid(name: &str) -> Result<ObjectIdentifier, ParseError> {
    let name = name.trim();
    if let Some(known) = lookup_by_name(name) {
        return Ok(known.oid);
    }
    let dotted = name
        .strip_prefix("OID.")
        .or_else(|| name.strip_prefix("oid."))
        .unwrap_or(name);
    if dotted.starts_with(|c: char| c.is_ascii_digit()) {
        return ObjectIdentifier::new(dotted).map_err(|_| ParseError::InvalidOid {
            value: name.to_string(),
        });
    }
    Err(ParseError::UnknownAttribute {
        name: name.to_string(),
    })
}

/// A single DN attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameAttribute {
    /// Attribute OID (for example `2.5.4.3` for CN).
    pub oid: ObjectIdentifier,
    /// Unescaped attribute value.
    pub value: String,
}

impl NameAttribute {
    fn label(&self) -> String {
        match lookup_by_oid(&self.oid) {
            Some(known) => known.names[0].to_string(),
            None => self.oid.to_string(),
        }
    }

    fn to_any(&self, encoding: DnEncoding) -> Result<Any, ParseError> {
        let syntax = lookup_by_oid(&self.oid).map_or(Syntax::Directory, |t| t.syntax);
        let tag = match (syntax, encoding) {
            (Syntax::Ia5, _) => {
                if !self.value.is_ascii() {
                    return Err(self.invalid("IA5String"));
                }
                Tag::Ia5String
            }
            (Syntax::Printable, _) => {
                if !is_printable_string(&self.value) {
                    return Err(self.invalid("PrintableString"));
                }
                Tag::PrintableString
            }
            (Syntax::Directory, DnEncoding::Utf8) => Tag::Utf8String,
            (Syntax::Directory, DnEncoding::Printable) => {
                if is_printable_string(&self.value) {
                    Tag::PrintableString
                } else {
                    Tag::Utf8String
                }
            }
        };
        Ok(Any::new(tag, self.value.as_bytes())?)
    }

    fn invalid(&self, kind: &'static str) -> ParseError {
        ParseError::InvalidString {
            attribute: self.label(),
            value: self.value.clone(),
            kind,
        }
    }
}

/// Reports whether every character is in the PrintableString alphabet.
pub(crate) fn is_printable_string(value: &str) -> bool {
    value.as_bytes().iter().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                *b,
                b' ' | b'\'' | b'(' | b')' | b'+' | b',' | b'-' | b'.' | b'/' | b':' | b'=' | b'?'
            )
    })
}

/// Distinguished Name as ordered attributes, most specific first (the order
/// of the textual form, `CN=Alice,O=Example,C=SE`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    /// Ordered list of attributes, one per RDN.
    pub attrs: Vec<NameAttribute>,
}

impl DistinguishedName {
    /// Parses the comma separated `TYPE=value` form. Values may be quoted or
    /// use `\` escapes for separators. An empty string yields an empty DN.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut attrs = Vec::new();
        for component in split_unescaped(input, ',')? {
            if component.trim().is_empty() {
                continue;
            }
            let (name, raw) = component
                .split_once('=')
                .ok_or_else(|| ParseError::MissingEquals {
                    component: component.clone(),
                })?;
            let oid = attribute_oid(name)?;
            let value = unescape(raw)?;
            if value.is_empty() {
                return Err(ParseError::EmptyValue {
                    attribute: name.trim().to_string(),
                });
            }
            attrs.push(NameAttribute { oid, value });
        }
        Ok(Self { attrs })
    }

    /// Reports whether the DN holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Returns the values of every attribute with the given OID, in order.
    pub fn values(&self, oid: &ObjectIdentifier) -> impl Iterator<Item = &str> {
        self.attrs
            .iter()
            .filter(move |a| a.oid == *oid)
            .map(|a| a.value.as_str())
    }

    /// Drops every attribute whose type is not listed.
    pub fn retain_types(&mut self, keep: &[ObjectIdentifier]) {
        self.attrs.retain(|a| keep.contains(&a.oid));
    }

    /// Appends a postfix to every CN value.
    pub fn append_cn_postfix(&mut self, postfix: &str) {
        for attr in self.attrs.iter_mut().filter(|a| a.oid == oid::AT_COMMON_NAME) {
            attr.value.push_str(postfix);
        }
    }

    /// Encodes the DN as an X.509 Name. The RDN sequence runs from the most
    /// general attribute to the most specific, so the textual order is
    /// reversed; each attribute gets its own RDN.
    pub fn to_name(&self, encoding: DnEncoding) -> Result<Name, ParseError> {
        let mut rdns = Vec::with_capacity(self.attrs.len());
        for attr in self.attrs.iter().rev() {
            let atav = AttributeTypeAndValue {
                oid: attr.oid,
                value: attr.to_any(encoding)?,
            };
            rdns.push(RelativeDistinguishedName::from(SetOfVec::try_from(vec![atav])?));
        }
        Ok(RdnSequence(rdns))
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=", attr.label())?;
            for c in attr.value.chars() {
                if matches!(c, ',' | '+' | '"' | '\\' | '=' | '<' | '>' | ';') {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// Splits `input` on every `sep` that is neither escaped with `\` nor inside
/// double quotes. Escapes and quotes are kept in the returned pieces.
pub(crate) fn split_unescaped(input: &str, sep: char) -> Result<Vec<String>, ParseError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let next = chars.next().ok_or(ParseError::DanglingEscape)?;
                current.push('\\');
                current.push(next);
            }
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c == sep && !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    parts.push(current);
    Ok(parts)
}

/// Strips surrounding whitespace and quotes and resolves `\` escapes.
///
/// A quoted value must end at its first unescaped closing quote.
pub(crate) fn unescape(raw: &str) -> Result<String, ParseError> {
    let trimmed = raw.trim();
    let (inner, quoted) = match trimmed.strip_prefix('"') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let mut out = String::with_capacity(inner.len());
    let mut closed = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if closed {
            return Err(ParseError::UnterminatedQuote);
        }
        match c {
            '\\' => out.push(chars.next().ok_or(ParseError::DanglingEscape)?),
            '"' if quoted => closed = true,
            '"' => {}
            c => out.push(c),
        }
    }
    if quoted && !closed {
        return Err(ParseError::UnterminatedQuote);
    }
    Ok(out)
}
