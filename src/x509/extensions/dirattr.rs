// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Subject directory attributes (RFC 3739, section 3.2.2).

use crate::x509::ParseError;
use crate::x509::name::{split_unescaped, unescape};
use crate::x509::oid;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, PrintableString, SetOfVec};
use x509_cert::attr::Attribute;

/// Parses `dateOfBirth=19700101, placeOfBirth=Stockholm, gender=M,
/// countryOfCitizenship=SE, countryOfResidence=SE` into attributes, in input
/// order. Attribute names are case insensitive; an empty string yields none.
pub(crate) fn parse(input: &str) -> Result<Vec<Attribute>, ParseError> {
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
        let name = name.trim();
        let value = unescape(raw)?;

        let (oid, encoded) = match name.to_ascii_lowercase().as_str() {
            "dateofbirth" => (oid::PDA_DATE_OF_BIRTH, date_of_birth(name, &value)?),
            "placeofbirth" => {
                if value.is_empty() {
                    return Err(invalid(name, &value));
                }
                (
                    oid::PDA_PLACE_OF_BIRTH,
                    Any::new(Tag::Utf8String, value.as_bytes().to_vec())?,
                )
            }
            "gender" => {
                let upper = value.to_ascii_uppercase();
                if upper != "M" && upper != "F" {
                    return Err(invalid(name, &value));
                }
                (oid::PDA_GENDER, Any::encode_from(&PrintableString::new(&upper)?)?)
            }
            "countryofcitizenship" => (oid::PDA_COUNTRY_OF_CITIZENSHIP, country(name, &value)?),
            "countryofresidence" => (oid::PDA_COUNTRY_OF_RESIDENCE, country(name, &value)?),
            _ => {
                return Err(ParseError::UnknownDirectoryAttribute {
                    name: name.to_string(),
                });
            }
        };
        attrs.push(attribute(oid, encoded)?);
    }
    Ok(attrs)
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute, ParseError> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

fn invalid(name: &str, value: &str) -> ParseError {
    ParseError::InvalidDirectoryAttribute {
        attribute: name.to_string(),
        value: value.to_string(),
    }
}

/// Encodes YYYYMMDD as GeneralizedTime at noon UTC. Any year from 0000 to
/// 9999 is accepted.
fn date_of_birth(name: &str, value: &str) -> Result<Any, ParseError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(name, value));
    }
    let field = |range: std::ops::Range<usize>| value[range].parse::<u16>();
    let (year, month, day) = match (field(0..4), field(4..6), field(6..8)) {
        (Ok(y), Ok(m), Ok(d)) => (y, m, d),
        _ => return Err(invalid(name, value)),
    };
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return Err(invalid(name, value));
    }
    Ok(Any::new(
        Tag::GeneralizedTime,
        format!("{value}120000Z").into_bytes(),
    )?)
}

fn days_in_month(year: u16, month: u16) -> u16 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Encodes an ISO 3166 alpha-2 code as PrintableString.
fn country(name: &str, value: &str) -> Result<Any, ParseError> {
    let upper = value.to_ascii_uppercase();
    if upper.len() != 2 || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(invalid(name, value));
    }
    Ok(Any::encode_from(&PrintableString::new(&upper)?)?)
}
