// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Certificate authority engine.
//!
//! Issues X.509v3 certificates and CRLv2 revocation lists signed through an
//! abstract [`token::CaSigningKey`], and escrows generated key pairs as CMS
//! enveloped data for later recovery.
//!
//! All builders are synchronous and hold no internal locks. Callers must
//! serialize access per CA key purpose unless the signing key implementation
//! is itself thread safe.

pub mod config;
pub mod error;
pub mod pem;
pub mod rand;
pub mod recovery;
pub mod rsa;
pub mod token;
pub mod x509;

pub use error::{Error, Result};
