// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Key recovery blobs: a generated key pair enveloped for the CA.
//!
//! https://datatracker.ietf.org/doc/html/rfc5652#section-6
//!
//! The key pair is serialized as `SEQUENCE { privateKey OCTET STRING,
//! publicKey SubjectPublicKeyInfo }`, encrypted with AES-256-CBC under a fresh
//! content key, and the content key is transported to the CA's KeyEncrypt key
//! with rsaEncryption. The recipient is named by the key's SHA-1 identifier.

use crate::error::{Error, Result};
use crate::rand;
use crate::rsa::{self, key_identifier};
use crate::token::{CaSigningKey, KeyPurpose};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::enveloped_data::{
    EncryptedContentInfo, EnvelopedData, KeyTransRecipientInfo, RecipientIdentifier,
    RecipientInfo, RecipientInfos,
};
use const_oid::ObjectIdentifier;
use der::asn1::{Any, OctetString, SetOfVec};
use der::{Decode, Encode, Sequence};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::fmt;
use tracing::{debug, info};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use zeroize::Zeroizing;

const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const ID_ENVELOPED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
const ID_AES256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");
const RSA_ENCRYPTION: ObjectIdentifier = const_oid::db::rfc5912::RSA_ENCRYPTION;

const CONTENT_KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// An end entity key pair held for recovery.
#[derive(Clone)]
pub struct KeyPair {
    private_key: Zeroizing<Vec<u8>>,
    public_key: SubjectPublicKeyInfoOwned,
}

impl KeyPair {
    /// Creates a key pair from a PKCS#8 private key and its public key.
    pub fn new(private_key_der: Vec<u8>, public_key: SubjectPublicKeyInfoOwned) -> Self {
        Self {
            private_key: Zeroizing::new(private_key_der),
            public_key,
        }
    }

    /// Creates a key pair from an RSA private key.
    pub fn from_rsa(secret: &rsa::SecretKey) -> Result<Self> {
        let private_key = secret.to_der().map_err(Error::recovery)?;
        let public_key = secret.public_key().to_spki().map_err(Error::recovery)?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Returns the PKCS#8 DER private key.
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key
    }

    pub fn public_key(&self) -> &SubjectPublicKeyInfoOwned {
        &self.public_key
    }

    fn to_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let info = KeyPairInfo {
            private_key: OctetString::new(self.private_key.as_slice()).map_err(encoding_error)?,
            public_key: self.public_key.clone(),
        };
        Ok(Zeroizing::new(info.to_der().map_err(encoding_error)?))
    }

    fn from_der(der: &[u8]) -> Result<Self> {
        let info = KeyPairInfo::from_der(der)
            .map_err(|e| Error::recovery(format!("key pair: {e}")))?;
        Ok(Self::new(info.private_key.into_bytes(), info.public_key))
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.private_key.as_slice() == other.private_key.as_slice()
            && self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key.algorithm.oid)
            .finish()
    }
}

#[derive(Sequence)]
struct KeyPairInfo {
    private_key: OctetString,
    public_key: SubjectPublicKeyInfoOwned,
}

/// DER encoded CMS ContentInfo carrying enveloped key pair data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRecoveryBlob(Vec<u8>);

impl KeyRecoveryBlob {
    /// Wraps stored blob bytes; they are only checked when unwrapped.
    pub fn from_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    pub fn into_der(self) -> Vec<u8> {
        self.0
    }
}

/// Envelopes `key_pair` for the KeyEncrypt key of `signing_key`.
pub fn wrap_key_pair(key_pair: &KeyPair, signing_key: &dyn CaSigningKey) -> Result<KeyRecoveryBlob> {
    let recipient = signing_key.public_key(KeyPurpose::KeyEncrypt)?;
    let transport = rsa::PublicKey::from_spki(&recipient)
        .map_err(|e| Error::recovery(format!("key transport key: {e}")))?;
    let rid = key_identifier(&recipient);

    let content_key = Zeroizing::new(rand::generate(CONTENT_KEY_SIZE).map_err(Error::recovery)?);
    let iv = rand::generate(IV_SIZE).map_err(Error::recovery)?;

    let plaintext = key_pair.to_der()?;
    let ciphertext = Aes256CbcEnc::new_from_slices(&content_key, &iv)
        .map_err(Error::recovery)?
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
    let enc_key = transport
        .encrypt(&content_key)
        .map_err(|e| Error::recovery(format!("content key transport: {e}")))?;

    let blob = encode_envelope(&rid, enc_key, iv, ciphertext).map_err(encoding_error)?;

    info!(recipient = %hex::encode(rid), "wrapped key pair for recovery");
    Ok(KeyRecoveryBlob(blob))
}

fn encode_envelope(
    rid: &[u8],
    enc_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
) -> der::Result<Vec<u8>> {
    let ktri = KeyTransRecipientInfo {
        version: CmsVersion::V2,
        rid: RecipientIdentifier::SubjectKeyIdentifier(SubjectKeyIdentifier(OctetString::new(
            rid,
        )?)),
        key_enc_alg: AlgorithmIdentifierOwned {
            oid: RSA_ENCRYPTION,
            parameters: Some(Any::from(der::asn1::Null)),
        },
        enc_key: OctetString::new(enc_key)?,
    };
    let enveloped = EnvelopedData {
        version: CmsVersion::V2,
        originator_info: None,
        recip_infos: RecipientInfos(SetOfVec::try_from(vec![RecipientInfo::Ktri(ktri)])?),
        encrypted_content: EncryptedContentInfo {
            content_type: ID_DATA,
            content_enc_alg: AlgorithmIdentifierOwned {
                oid: ID_AES256_CBC,
                parameters: Some(Any::encode_from(&OctetString::new(iv)?)?),
            },
            encrypted_content: Some(OctetString::new(ciphertext)?),
        },
        unprotected_attrs: None,
    };
    ContentInfo {
        content_type: ID_ENVELOPED_DATA,
        content: Any::encode_from(&enveloped)?,
    }
    .to_der()
}

// Encoding failures while sealing are reported like decoding failures.
fn encoding_error(err: der::Error) -> Error {
    Error::recovery(format!("key recovery encoding: {err}"))
}

/// Opens a blob produced by [`wrap_key_pair`] with the KeyEncrypt key of
/// `signing_key`.
///
/// An offline token is reported as such; every other failure, including a
/// blob addressed to a different key, is a key recovery error.
pub fn unwrap_key_pair(blob: &KeyRecoveryBlob, signing_key: &dyn CaSigningKey) -> Result<KeyPair> {
    let recipient = signing_key.public_key(KeyPurpose::KeyEncrypt)?;
    let rid = key_identifier(&recipient);

    let content_info = ContentInfo::from_der(&blob.0)
        .map_err(|e| Error::recovery(format!("content info: {e}")))?;
    if content_info.content_type != ID_ENVELOPED_DATA {
        return Err(Error::recovery(format!(
            "unexpected content type {}",
            content_info.content_type
        )));
    }
    let enveloped: EnvelopedData = content_info
        .content
        .decode_as()
        .map_err(|e| Error::recovery(format!("enveloped data: {e}")))?;

    let ktri = enveloped
        .recip_infos
        .0
        .iter()
        .find_map(|info| match info {
            RecipientInfo::Ktri(ktri) => match &ktri.rid {
                RecipientIdentifier::SubjectKeyIdentifier(ski) if ski.0.as_bytes() == &rid[..] => {
                    Some(ktri)
                }
                _ => None,
            },
            _ => None,
        })
        .ok_or_else(|| Error::recovery("no recipient matches the key encryption key"))?;
    if ktri.key_enc_alg.oid != RSA_ENCRYPTION {
        return Err(Error::recovery(format!(
            "unsupported key encryption algorithm {}",
            ktri.key_enc_alg.oid
        )));
    }
    debug!(recipient = %hex::encode(rid), "found key recovery recipient");

    let content_key = signing_key
        .decrypt(KeyPurpose::KeyEncrypt, ktri.enc_key.as_bytes())
        .map_err(|e| {
            if e.is_token_offline() {
                e
            } else {
                Error::recovery(format!("content key transport: {e}"))
            }
        })?;
    if content_key.len() != CONTENT_KEY_SIZE {
        return Err(Error::recovery("content key has the wrong size"));
    }

    let content = &enveloped.encrypted_content;
    if content.content_enc_alg.oid != ID_AES256_CBC {
        return Err(Error::recovery(format!(
            "unsupported content encryption algorithm {}",
            content.content_enc_alg.oid
        )));
    }
    let iv: OctetString = content
        .content_enc_alg
        .parameters
        .as_ref()
        .ok_or_else(|| Error::recovery("missing content encryption IV"))?
        .decode_as()
        .map_err(|e| Error::recovery(format!("content encryption IV: {e}")))?;
    let ciphertext = content
        .encrypted_content
        .as_ref()
        .ok_or_else(|| Error::recovery("missing encrypted content"))?;

    let plaintext = Zeroizing::new(
        Aes256CbcDec::new_from_slices(&content_key, iv.as_bytes())
            .map_err(|_| Error::recovery("content encryption IV has the wrong size"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext.as_bytes())
            .map_err(|_| Error::recovery("content decryption failed"))?,
    );
    KeyPair::from_der(&plaintext)
}
