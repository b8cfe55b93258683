// caforge: certificate authority engine
// Copyright 2025 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Operating system randomness for serials, content keys and IVs.

/// fill overwrites the buffer with randomness from the OS CSPRNG.
pub fn fill(buf: &mut [u8]) -> Result<(), getrandom::Error> {
    getrandom::fill(buf)
}

/// generate creates an arbitrarily large buffer filled with randomness.
pub fn generate(bytes: usize) -> Result<Vec<u8>, getrandom::Error> {
    let mut buf = vec![0u8; bytes];
    fill(&mut buf[..])?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use crate::rand::generate;

    // Tests that generating different sized random buffers work. This test is
    // more of a smoke-test that the API works; it does not actually test the
    // quality of the generated random numbers.
    #[test]
    fn test_generate() {
        for size in [0, 1, 16, 32, 33, 1024 * 1024] {
            assert_eq!(generate(size).unwrap().len(), size);
        }
    }

    // Tests that two content-key sized draws never collide.
    #[test]
    fn test_generate_distinct() {
        let a = generate(32).unwrap();
        let b = generate(32).unwrap();
        assert_ne!(a, b);
    }
}
