//! Key policy and the raw key primitives the signer builds on.
//!
//! The issuance pipeline is hard-coded to one algorithm. [`PrivateKey`],
//! [`PublicKey`] and [`KEY_SIZE`] are the only places that name it.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{IssuanceError, Result};

/// Size in bits of every generated key.
pub const KEY_SIZE: usize = 4096;

/// Private half of an issued key pair.
pub type PrivateKey = RsaPrivateKey;

/// Public half of an issued key pair.
pub type PublicKey = RsaPublicKey;

/// Generate a fresh private key of [`KEY_SIZE`] bits from the OS entropy source.
pub fn generate_private_key() -> Result<PrivateKey> {
    let mut rng = rand_core::OsRng;
    RsaPrivateKey::new(&mut rng, KEY_SIZE)
        .map_err(|e| IssuanceError::KeyGeneration(e.to_string()))
}

/// Encode a public key as a `SubjectPublicKeyInfo`.
pub fn subject_public_key_info(public: &PublicKey) -> Result<SubjectPublicKeyInfoOwned> {
    SubjectPublicKeyInfoOwned::from_key(public.clone())
        .map_err(|e| IssuanceError::Signing(format!("cannot encode public key: {e}")))
}

/// SHA-1 over the public key bit string, as used for key identifier extensions.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    <Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// Sign `data` with RSASSA-PKCS1-v1_5 over SHA-256.
pub(crate) fn sign_data(private: &PrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha256>::new(private.clone());
    let signature = signing_key
        .try_sign(data)
        .map_err(|e| IssuanceError::Signing(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Check an RSASSA-PKCS1-v1_5 / SHA-256 signature.
pub(crate) fn verify_data(public: &PublicKey, data: &[u8], signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::<Sha256>::new(public.clone());
    Signature::try_from(signature)
        .and_then(|signature| verifying_key.verify(data, &signature))
        .is_ok()
}
