// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![no_main]

use caforge::x509::{AltNames, DistinguishedName, DnEncoding};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(dn) = DistinguishedName::parse(input) {
        for encoding in [DnEncoding::Utf8, DnEncoding::Printable] {
            // Encoding may refuse values, but must never panic
            let _ = dn.to_name(encoding);
        }
        let _ = dn.to_string();
    }
    if let Ok(names) = AltNames::parse(input) {
        for encoding in [DnEncoding::Utf8, DnEncoding::Printable] {
            let _ = names.to_general_names(encoding);
        }
    }
});
