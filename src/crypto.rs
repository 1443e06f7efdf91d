//! weapi request envelope.
//!
//! The service expects form parameters encrypted as:
//! `params = b64(aes_cbc(b64(aes_cbc(json, PRESET_KEY)), session_key))` and
//! `encSecKey = hex(rsa(reverse(session_key)))`, where the session key is 16
//! random hex characters and RSA is textbook (no padding) with the service's
//! public key. These constants are fixed by the service.

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::api::ApiError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

// ============================================================================
// Protocol Constants
// ============================================================================

const MODULUS_HEX: &str = "00e0b509f6259df8642dbc35662901477df22677ec152b5ff68ace615bb7b725152b3ab17a876aea8a5aa76d2e417629ec4ee341f56135fccf695280104e0312ecbda92557c93870114af6c9d05c4f7f0c3685b7a46bee255932575cce10b424d813cfe4875d3e82047b97ddef52741d546b8e289dc6935b3ece0462db0a22b8e7";
const PUBLIC_EXPONENT_HEX: &str = "010001";
const PRESET_KEY: &[u8; 16] = b"0CoJUm6Qyw8W8jud";
const IV: &[u8; 16] = b"0102030405060708";

/// Width of the hex-encoded RSA output
const ENC_SEC_KEY_LEN: usize = 256;

static MODULUS: Lazy<BigUint> =
    Lazy::new(|| BigUint::parse_bytes(MODULUS_HEX.as_bytes(), 16).unwrap());
static PUBLIC_EXPONENT: Lazy<BigUint> =
    Lazy::new(|| BigUint::parse_bytes(PUBLIC_EXPONENT_HEX.as_bytes(), 16).unwrap());

// ============================================================================
// Envelope
// ============================================================================

/// Encrypted form body for a weapi POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedForm {
    pub params: String,
    #[serde(rename = "encSecKey")]
    pub enc_sec_key: String,
}

/// Random 16-character lowercase hex session key.
pub fn create_secret_key() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}

/// AES-128-CBC with PKCS#7 padding and the fixed IV, base64-encoded.
pub fn aes_encrypt(plaintext: &[u8], key: &[u8]) -> Result<String, ApiError> {
    let cipher = Aes128CbcEnc::new_from_slices(key, IV)
        .map_err(|e| ApiError::Crypto(format!("aes key: {e}")))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok(STANDARD.encode(ciphertext))
}

/// Textbook RSA of the reversed key, as 256 zero-padded hex digits.
pub fn rsa_encrypt(key: &str) -> String {
    let reversed: Vec<u8> = key.bytes().rev().collect();
    let encrypted = BigUint::from_bytes_be(&reversed).modpow(&PUBLIC_EXPONENT, &MODULUS);
    format!("{:0>width$}", encrypted.to_str_radix(16), width = ENC_SEC_KEY_LEN)
}

/// Encrypt a JSON payload with an explicit session key.
pub fn encrypt_with_key<T: Serialize + ?Sized>(
    payload: &T,
    secret_key: &str,
) -> Result<EncryptedForm, ApiError> {
    let json = serde_json::to_string(payload)?;
    let inner = aes_encrypt(json.as_bytes(), PRESET_KEY)?;
    let params = aes_encrypt(inner.as_bytes(), secret_key.as_bytes())?;
    Ok(EncryptedForm {
        params,
        enc_sec_key: rsa_encrypt(secret_key),
    })
}

/// Encrypt a JSON payload with a fresh session key.
pub fn encrypt_request<T: Serialize + ?Sized>(payload: &T) -> Result<EncryptedForm, ApiError> {
    encrypt_with_key(payload, &create_secret_key())
}
