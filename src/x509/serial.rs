// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::rand;
use x509_cert::serial_number::SerialNumber;

/// Produces random certificate serial numbers of a fixed width.
///
/// The top two bits of the first octet are forced to `01`, so every serial is
/// positive, non-zero, needs no DER padding octet and always has the same bit
/// length. Uniqueness rests on the remaining randomness; no issued values are
/// tracked.
#[derive(Clone, Copy, Debug)]
pub struct SerialNumberAllocator {
    width: usize,
}

impl SerialNumberAllocator {
    /// Default serial width in octets (126 random bits).
    pub const DEFAULT_WIDTH: usize = 16;
    /// Smallest accepted width in octets.
    pub const MIN_WIDTH: usize = 8;
    /// Largest width RFC 5280 allows conforming CAs to emit.
    pub const MAX_WIDTH: usize = 20;

    /// Creates an allocator producing serials of [`Self::DEFAULT_WIDTH`] octets.
    pub fn new() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
        }
    }

    /// Creates an allocator producing serials of `width` octets.
    pub fn with_width(width: usize) -> Result<Self> {
        if !(Self::MIN_WIDTH..=Self::MAX_WIDTH).contains(&width) {
            return Err(Error::invalid_profile(format!(
                "serial width {width} outside {}..={}",
                Self::MIN_WIDTH,
                Self::MAX_WIDTH
            )));
        }
        Ok(Self { width })
    }

    /// Returns the configured width in octets.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Draws the next serial number.
    pub fn next(&self) -> Result<SerialNumber> {
        let mut bytes = vec![0u8; self.width];
        rand::fill(&mut bytes).map_err(|e| Error::SerialGeneration {
            details: e.to_string(),
        })?;
        bytes[0] = (bytes[0] & 0x3f) | 0x40;

        SerialNumber::new(&bytes).map_err(|e| Error::SerialGeneration {
            details: e.to_string(),
        })
    }
}

impl Default for SerialNumberAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    /// Verifies the width bounds.
    #[test]
    fn test_with_width_bounds() {
        assert!(SerialNumberAllocator::with_width(7).is_err());
        assert!(SerialNumberAllocator::with_width(21).is_err());
        assert_eq!(SerialNumberAllocator::with_width(8).unwrap().width(), 8);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Verifies that serials of any width are positive, non-zero and
        /// exactly `width` octets long.
        #[test]
        fn prop_serial_is_positive_fixed_width(width in 8usize..=20) {
            let alloc = SerialNumberAllocator::with_width(width).unwrap();
            for _ in 0..16 {
                let serial = alloc.next().unwrap();
                let bytes = serial.as_bytes();
                prop_assert_eq!(bytes.len(), width);
                prop_assert!(bytes[0] & 0x80 == 0);
                prop_assert!(bytes[0] & 0x40 != 0);
            }
        }
    }
}
