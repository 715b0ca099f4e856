// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate validity evaluation.

use chrono::{DateTime, Utc};
use fiskal_core::types::CertificateValidity;

/// `true` unless `now` lies inside the certificate's NotBefore/NotAfter window
/// and, when the certificate restricts it, inside the private-key-usage
/// period as well.
pub fn is_certificate_expired(certificate: &CertificateValidity, now: DateTime<Utc>) -> bool {
    let in_validity = certificate.validity.contains(now);
    let in_usage_period = certificate
        .private_key_usage_period
        .as_ref()
        .is_none_or(|period| period.contains(now));
    !(in_validity && in_usage_period)
}
