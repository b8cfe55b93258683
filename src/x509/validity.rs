// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::SubjectRequest;
use crate::config::{CertificateProfile, ProfileType};
use crate::error::{Error, Result};
use der::asn1::{GeneralizedTime, UtcTime};
use std::time::Duration;
use tracing::{debug, info};
use x509_cert::time::Time;

/// notBefore is backdated by this much to tolerate skewed relying party clocks.
pub const CLOCK_SKEW_MARGIN: u64 = 10 * 60;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// 2050-01-01T00:00:00Z; from here on RFC 5280 requires GeneralizedTime.
const UTC_TIME_LIMIT: u64 = 2_524_608_000;

/// Effective validity of a certificate, in UNIX seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: u64,
    pub not_after: u64,
}

/// Computes the validity window of a certificate issued at `now`.
///
/// Caller supplied bounds are used only when the profile allows it. For any
/// profile other than a root CA, notAfter is clamped to the signer's own
/// notAfter, and a notBefore at or past the signer's expiry is refused.
/// Finally notAfter is raised to notBefore if it ended up earlier.
pub fn resolve_validity(
    now: u64,
    request: &SubjectRequest,
    profile: &CertificateProfile,
    ca_not_after: Option<u64>,
) -> Result<ValidityWindow> {
    let override_not_before = request
        .not_before
        .filter(|_| profile.allow_validity_override);
    let not_before = match override_not_before {
        Some(nb) => {
            debug!(not_before = nb, "using notBefore from request");
            nb
        }
        None => now.saturating_sub(CLOCK_SKEW_MARGIN),
    };

    let mut not_after = match request.not_after.filter(|_| profile.allow_validity_override) {
        Some(na) => {
            debug!(not_after = na, "using notAfter from request");
            na
        }
        None => {
            debug!(days = profile.validity_days, "using validity from profile");
            now.saturating_add(profile.validity_days.saturating_mul(SECONDS_PER_DAY))
        }
    };

    if profile.profile_type != ProfileType::RootCa
        && let Some(ca_not_after) = ca_not_after
    {
        if not_before >= ca_not_after {
            let details = format!(
                "notBefore {not_before} is not before the CA certificate expiry {ca_not_after}"
            );
            return Err(match override_not_before {
                Some(_) => Error::invalid_subject(details),
                None => Error::InvalidCaCertificate { details },
            });
        }
        if not_after > ca_not_after {
            info!(
                requested = not_after,
                limit = ca_not_after,
                "limiting certificate validity to CA certificate expiry"
            );
            not_after = ca_not_after;
        }
    }
    if not_after <= not_before {
        not_after = not_before;
    }
    Ok(ValidityWindow {
        not_before,
        not_after,
    })
}

/// Encodes a timestamp as UTCTime before 2050 and GeneralizedTime after.
pub(crate) fn encode_time(secs: u64) -> Result<Time> {
    let since_epoch = Duration::from_secs(secs);
    if secs < UTC_TIME_LIMIT {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(since_epoch)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            since_epoch,
        )?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rsa;
    use proptest::prelude::*;
    use std::sync::OnceLock;
    use x509_cert::spki::SubjectPublicKeyInfoOwned;

    const NOW: u64 = 1_750_000_000;

    fn spki() -> SubjectPublicKeyInfoOwned {
        static SPKI: OnceLock<SubjectPublicKeyInfoOwned> = OnceLock::new();
        SPKI.get_or_init(|| {
            rsa::SecretKey::from_pem(rsa::test::TEST_KEY_PEM)
                .unwrap()
                .public_key()
                .to_spki()
                .unwrap()
        })
        .clone()
    }

    fn request(not_before: Option<u64>, not_after: Option<u64>) -> SubjectRequest {
        SubjectRequest {
            not_before,
            not_after,
            ..SubjectRequest::new("CN=Alice", spki())
        }
    }

    /// Verifies the default window: backdated start, profile length.
    #[test]
    fn test_default_window() {
        let profile = CertificateProfile::end_user();
        let window = resolve_validity(NOW, &request(None, None), &profile, None).unwrap();
        assert_eq!(window.not_before, NOW - CLOCK_SKEW_MARGIN);
        assert_eq!(window.not_after, NOW + 730 * SECONDS_PER_DAY);
    }

    /// Verifies that request bounds are ignored unless the profile allows them.
    #[test]
    fn test_override_requires_permission() {
        let mut profile = CertificateProfile::end_user();
        let req = request(Some(NOW + 100), Some(NOW + 200));

        let window = resolve_validity(NOW, &req, &profile, None).unwrap();
        assert_eq!(window.not_before, NOW - CLOCK_SKEW_MARGIN);

        profile.allow_validity_override = true;
        let window = resolve_validity(NOW, &req, &profile, None).unwrap();
        assert_eq!(window, ValidityWindow { not_before: NOW + 100, not_after: NOW + 200 });
    }

    /// Verifies clamping for subordinates and no clamping for roots.
    #[test]
    fn test_clamp_to_ca_expiry() {
        let ca_not_after = NOW + 30 * SECONDS_PER_DAY;
        let window = resolve_validity(
            NOW,
            &request(None, None),
            &CertificateProfile::end_user(),
            Some(ca_not_after),
        )
        .unwrap();
        assert_eq!(window.not_after, ca_not_after);

        let window = resolve_validity(
            NOW,
            &request(None, None),
            &CertificateProfile::root_ca(),
            Some(ca_not_after),
        )
        .unwrap();
        assert!(window.not_after > ca_not_after);
    }

    /// Verifies that an inverted window collapses to zero length.
    #[test]
    fn test_inverted_window_collapses() {
        let mut profile = CertificateProfile::end_user();
        profile.allow_validity_override = true;
        let window = resolve_validity(NOW, &request(Some(NOW), Some(NOW - 5)), &profile, None).unwrap();
        assert_eq!(window.not_after, window.not_before);
    }

    /// Verifies that a start at or past the CA expiry is refused.
    #[test]
    fn test_rejects_start_after_ca_expiry() {
        let mut profile = CertificateProfile::end_user();
        profile.allow_validity_override = true;
        let err = resolve_validity(NOW, &request(Some(NOW + 100), None), &profile, Some(NOW + 100))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSubject { .. }));

        let err = resolve_validity(NOW, &request(None, None), &profile, Some(NOW - 3600)).unwrap_err();
        assert!(matches!(err, Error::InvalidCaCertificate { .. }));
    }

    /// Verifies the UTCTime / GeneralizedTime switch.
    #[test]
    fn test_encode_time() {
        assert!(matches!(encode_time(UTC_TIME_LIMIT - 1).unwrap(), Time::UtcTime(_)));
        assert!(matches!(encode_time(UTC_TIME_LIMIT).unwrap(), Time::GeneralTime(_)));
    }

    proptest! {
        /// Verifies that a subordinate window never outlives the signer and is
        /// never inverted, whatever the caller asks for.
        #[test]
        fn prop_subordinate_window_bounded(
            nb in proptest::option::of(NOW - 1_000_000..NOW + 1_000_000),
            na in proptest::option::of(0u64..NOW * 2),
            days in 0u64..20_000,
            ca_offset in 1_000_001u64..100_000_000,
        ) {
            let mut profile = CertificateProfile::end_user();
            profile.allow_validity_override = true;
            profile.validity_days = days;
            let ca_not_after = NOW + ca_offset;

            let window = resolve_validity(NOW, &request(nb, na), &profile, Some(ca_not_after)).unwrap();
            prop_assert!(window.not_after <= ca_not_after);
            prop_assert!(window.not_after >= window.not_before);
        }
    }
}
