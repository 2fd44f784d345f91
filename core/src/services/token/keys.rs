//! RSA key parsing, fingerprinting, PEM export and generation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::TokenError;

/// Minimum accepted RSA modulus size
pub const MIN_RSA_BITS: usize = 2048;

/// The only accepted RSA public exponent
pub const RSA_EXPONENT: u64 = 65537;

/// Parses a PEM private key in PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8
/// (`PRIVATE KEY`) form
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, TokenError> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(TokenError::key_parse("private key PEM is empty"));
    }

    RsaPrivateKey::from_pkcs1_pem(pem).or_else(|pkcs1_err| {
        RsaPrivateKey::from_pkcs8_pem(pem).map_err(|pkcs8_err| {
            TokenError::key_parse(format!(
                "private key is neither PKCS#1 ({pkcs1_err}) nor PKCS#8 RSA ({pkcs8_err})"
            ))
        })
    })
}

/// Parses a PEM `PUBLIC KEY` (SubjectPublicKeyInfo)
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, TokenError> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(TokenError::key_parse("public key PEM is empty"));
    }

    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| TokenError::key_parse(format!("invalid RSA public key: {e}")))
}

/// Parses a key pair and checks that both halves belong together and that the
/// key is strong enough
pub fn load_key_pair(private_pem: &str, public_pem: &str) -> Result<RsaPrivateKey, TokenError> {
    let private_key = parse_private_key_pem(private_pem)?;
    let public_key = parse_public_key_pem(public_pem)?;

    if private_key.n() != public_key.n() || private_key.e() != public_key.e() {
        return Err(TokenError::KeyPairMismatch);
    }

    validate_rsa_key(&public_key)?;
    Ok(private_key)
}

/// Rejects moduli below [`MIN_RSA_BITS`] and non-standard exponents
pub fn validate_rsa_key(key: &RsaPublicKey) -> Result<(), TokenError> {
    let bits = key.size() * 8;
    if bits < MIN_RSA_BITS {
        return Err(TokenError::WeakKey {
            message: format!("RSA modulus is {bits} bits, minimum is {MIN_RSA_BITS}"),
        });
    }
    if key.e() != &BigUint::from(RSA_EXPONENT) {
        return Err(TokenError::WeakKey {
            message: "non-standard RSA public exponent".to_string(),
        });
    }
    Ok(())
}

/// RFC 7638 style fingerprint of an RSA public key.
///
/// SHA-256 over the canonical JSON `{"e":..,"kty":"RSA","n":..}`, truncated to
/// 16 bytes and encoded as unpadded base64url.
pub fn key_id(key: &RsaPublicKey) -> String {
    // base64url output never needs JSON escaping
    let canonical = format!(
        r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
        encode_component(key.e()),
        encode_component(key.n())
    );
    let digest = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

/// PKCS#1 PEM of a private key
pub fn private_key_to_pem(key: &RsaPrivateKey) -> Result<String, TokenError> {
    key.to_pkcs1_pem(LineEnding::LF)
        .map(|pem| pem.as_str().to_owned())
        .map_err(|e| TokenError::key_parse(format!("failed to encode private key: {e}")))
}

/// SPKI PEM of a public key
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, TokenError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| TokenError::key_parse(format!("failed to encode public key: {e}")))
}

pub(crate) fn encoding_key(key: &RsaPrivateKey) -> Result<EncodingKey, TokenError> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| TokenError::key_parse(format!("failed to encode private key: {e}")))?;
    Ok(EncodingKey::from_rsa_der(der.as_bytes()))
}

pub(crate) fn decoding_key(key: &RsaPublicKey) -> Result<DecodingKey, TokenError> {
    DecodingKey::from_rsa_components(&encode_component(key.n()), &encode_component(key.e()))
        .map_err(|e| TokenError::key_parse(format!("invalid RSA components: {e}")))
}

fn encode_component(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

/// Public key in JWK form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    pub fn from_public_key(key: &RsaPublicKey) -> Self {
        Self {
            kty: "RSA".to_string(),
            kid: key_id(key),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            n: encode_component(key.n()),
            e: encode_component(key.e()),
        }
    }
}

/// JWKS document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// Produces fresh signing keys for rotation
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError>;
}

/// Generates RSA keys from the thread-local CSPRNG
#[derive(Debug, Clone, Copy)]
pub struct RsaKeyGenerator {
    bits: usize,
}

impl RsaKeyGenerator {
    /// Generator for `bits`-sized keys; anything below [`MIN_RSA_BITS`] is rejected
    pub fn new(bits: usize) -> Result<Self, TokenError> {
        if bits < MIN_RSA_BITS {
            return Err(TokenError::WeakKey {
                message: format!("refusing to generate {bits}-bit RSA keys"),
            });
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl Default for RsaKeyGenerator {
    fn default() -> Self {
        Self { bits: MIN_RSA_BITS }
    }
}

impl KeyGenerator for RsaKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, self.bits).map_err(|e| TokenError::KeyGeneration {
            message: e.to_string(),
        })
    }
}
