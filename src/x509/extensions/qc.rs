// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Qualified certificate statements.
//!
//! https://datatracker.ietf.org/doc/html/rfc3739#section-3.2.6
//! ETSI EN 319 412-5

use crate::config::{DnEncoding, ParsedProfile, QcStatementSettings};
use crate::error::{Error, Result};
use crate::x509::oid;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, PrintableString};
use der::{Decode, Encode, Sequence, Tag};
use x509_cert::ext::pkix::name::GeneralName;

/// QCStatement ::= SEQUENCE { statementId, statementInfo OPTIONAL }
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct QcStatement {
    pub statement_id: ObjectIdentifier,
    #[asn1(optional = "true")]
    pub statement_info: Option<Any>,
}

/// SemanticsInformation ::= SEQUENCE {
///     semanticsIdentifier         OBJECT IDENTIFIER OPTIONAL,
///     nameRegistrationAuthorities NameRegistrationAuthorities OPTIONAL }
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SemanticsInformation {
    #[asn1(optional = "true")]
    pub semantics_identifier: Option<ObjectIdentifier>,
    #[asn1(optional = "true")]
    pub name_registration_authorities: Option<Vec<GeneralName>>,
}

/// MonetaryValue ::= SEQUENCE { currency, amount INTEGER, exponent INTEGER }
///
/// Only the alphabetic form of Iso4217CurrencyCode is produced.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct MonetaryValue {
    pub currency: PrintableString,
    pub amount: i64,
    pub exponent: i64,
}

/// Assembles the statement list in its fixed order: PKIX syntax (with
/// optional semantics information), ETSI compliance, value limit, SSCD and
/// the custom text statement.
pub(crate) fn statements(
    settings: &QcStatementSettings,
    parsed: &ParsedProfile,
    encoding: DnEncoding,
) -> Result<Vec<QcStatement>> {
    let mut statements = Vec::new();

    let syntax = match settings.use_pkix_qc_syntax_v2 {
        true => oid::QCS_PKIX_QC_SYNTAX_V2,
        false => oid::QCS_PKIX_QC_SYNTAX_V1,
    };
    let ra_names = if parsed.qc_ra_names.is_empty() {
        None
    } else {
        Some(
            parsed
                .qc_ra_names
                .to_general_names(encoding)
                .map_err(|e| Error::invalid_profile(format!("QC RA name: {e}")))?,
        )
    };
    let statement_info = match (parsed.qc_semantics_id, ra_names) {
        (None, None) => None,
        (semantics_identifier, name_registration_authorities) => {
            let info = SemanticsInformation {
                semantics_identifier,
                name_registration_authorities,
            };
            Some(Any::from_der(&info.to_der()?)?)
        }
    };
    statements.push(QcStatement {
        statement_id: syntax,
        statement_info,
    });

    if settings.use_etsi_qc_compliance {
        statements.push(QcStatement {
            statement_id: oid::ETSI_QCS_QC_COMPLIANCE,
            statement_info: None,
        });
    }
    let currency = settings.etsi_value_limit_currency.trim();
    if settings.use_etsi_value_limit && settings.etsi_value_limit > 0 && !currency.is_empty() {
        let value = MonetaryValue {
            currency: PrintableString::new(currency)?,
            amount: settings.etsi_value_limit,
            exponent: settings.etsi_value_limit_exponent,
        };
        statements.push(QcStatement {
            statement_id: oid::ETSI_QCS_LIMIT_VALUE,
            statement_info: Some(Any::from_der(&value.to_der()?)?),
        });
    }
    if settings.use_etsi_sscd {
        statements.push(QcStatement {
            statement_id: oid::ETSI_QCS_QC_SSCD,
            statement_info: None,
        });
    }
    let text = settings.custom_string_text.trim();
    if let Some(custom) = parsed.qc_custom_oid
        && !text.is_empty()
    {
        statements.push(QcStatement {
            statement_id: custom,
            statement_info: Some(Any::new(Tag::Utf8String, text.as_bytes().to_vec())?),
        });
    }
    Ok(statements)
}
