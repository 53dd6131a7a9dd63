//! Recoverable secp256k1 signatures in the wallet-native `(r, s, v)` form
//! and recovery of the signer address from a signed message.

use std::fmt;

use arrayref::array_ref;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use parity_scale_codec::{Decode, Encode};
use rand::{rngs::OsRng, SeedableRng as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::Digest as _;
use zeroize::Zeroize as _;

use crate::{hash::keccak256, EvmAddress, Error, ParseError};

/// Construct cryptographic RNG from seed.
fn rng_from_seed(mut seed: Vec<u8>) -> impl rand::RngCore + rand::CryptoRng {
    let hash: [u8; 32] = sha2::Sha256::digest(&seed).into();
    seed.zeroize();
    rand_chacha::ChaChaRng::from_seed(hash)
}

/// Hash of `message` in the `"\x19Ethereum Signed Message:\n" + len` envelope
/// which browser wallets apply before signing arbitrary text.
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let mut payload = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    payload.extend_from_slice(message.as_bytes());
    keccak256(payload)
}

/// Signature of an authorization message as produced by an EVM wallet.
///
/// `v` carries the recovery id in its legacy `27 | 28` form, which is what
/// `recover_address` uses to pick the signer key back out of the signature.
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
    v: u8,
}

impl Signature {
    /// Construct a signature from its scalar parts. Some wallets emit the
    /// raw `0 | 1` yParity form; it is normalized to legacy `27 | 28` here.
    ///
    /// # Errors
    /// If `v` is not a recovery value in either form.
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Result<Self, ParseError> {
        let v = match v {
            0 | 1 => v + 27,
            27 | 28 => v,
            other => return Err(ParseError(format!("Invalid recovery value: {other}"))),
        };
        Ok(Self { r, s, v })
    }

    /// The `r` scalar.
    pub const fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The `s` scalar.
    pub const fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// The legacy recovery value.
    pub const fn v(&self) -> u8 {
        self.v
    }

    /// Compact `r ‖ s ‖ v` representation.
    pub fn to_bytes(self) -> [u8; 65] {
        let mut payload = [0_u8; 65];
        payload[..32].copy_from_slice(&self.r);
        payload[32..64].copy_from_slice(&self.s);
        payload[64] = self.v;
        payload
    }

    /// Parse a signature from its compact `r ‖ s ‖ v` representation.
    ///
    /// # Errors
    /// If the payload is not 65 bytes long or `v` is invalid.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, ParseError> {
        if payload.len() != 65 {
            return Err(ParseError(format!(
                "Expected 65 bytes of signature, got {}",
                payload.len()
            )));
        }
        Self::new(
            *array_ref!(payload, 0, 32),
            *array_ref!(payload, 32, 32),
            payload[64],
        )
    }

    /// A shorthand for [`Self::from_bytes`] accepting the payload as hex.
    ///
    /// # Errors
    /// If the payload is not valid hex or not a valid signature.
    pub fn from_hex(payload: impl AsRef<str>) -> Result<Self, ParseError> {
        let payload = payload.as_ref();
        let payload = payload.strip_prefix("0x").unwrap_or(payload);
        Self::from_bytes(&crate::hex_decode(payload)?)
    }

    fn recovery_id(&self) -> Result<RecoveryId, Error> {
        RecoveryId::from_byte(self.v - 27).ok_or(Error::Recovery)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} }}", hex::encode_upper(self.to_bytes()))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = String::deserialize(deserializer)?;
        Self::from_hex(payload).map_err(de::Error::custom)
    }
}

/// Recover the EVM address of whoever signed `message` (EIP-191 envelope
/// applied) with the given signature.
///
/// # Errors
/// Fails if the signature does not recover to a valid public key.
pub fn recover_address(message: &str, signature: &Signature) -> Result<EvmAddress, Error> {
    let prehash = eip191_hash(message);
    let mut recovery_id = signature.recovery_id()?;

    let mut ecdsa = EcdsaSignature::from_scalars(signature.r, signature.s)
        .map_err(|_| Error::BadSignature)?;
    // Wallets emit the EIP-2 low-s form; if a foreign high-s signature comes
    // in anyway, normalizing flips the recovery parity.
    if let Some(normalized) = ecdsa.normalize_s() {
        ecdsa = normalized;
        recovery_id = RecoveryId::from_byte(recovery_id.to_byte() ^ 1).ok_or(Error::Recovery)?;
    }

    let key = VerifyingKey::recover_from_prehash(&prehash, &ecdsa, recovery_id)
        .map_err(|_| Error::Recovery)?;
    Ok(address_of(&key))
}

fn address_of(key: &VerifyingKey) -> EvmAddress {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    EvmAddress::new(*array_ref!(digest, 12, 20))
}

/// Pair of secp256k1 keys able to produce wallet-style recoverable signatures.
///
/// Backs the sample in-process wallet; production signing happens in a
/// browser wallet extension outside this codebase.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a random keypair from the OS entropy source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Derive a keypair deterministically from `seed`.
    pub fn from_seed(seed: Vec<u8>) -> Self {
        let mut rng = rng_from_seed(seed);
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Parse a keypair from a hex-encoded private key.
    ///
    /// # Errors
    /// If the payload is not a valid secp256k1 scalar.
    pub fn from_private_key_hex(payload: impl AsRef<str>) -> Result<Self, ParseError> {
        let payload = payload.as_ref();
        let payload = payload.strip_prefix("0x").unwrap_or(payload);
        let bytes = crate::hex_decode(payload)?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|err| ParseError(err.to_string()))?;
        Ok(Self { signing_key })
    }

    /// SEC1-compressed public key bytes.
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// EVM address of this keypair.
    pub fn address(&self) -> EvmAddress {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign `message` the way a wallet `signMessage` call does: EIP-191
    /// envelope, recoverable signature, legacy `v`.
    ///
    /// # Errors
    /// Fails if the underlying ECDSA signing fails.
    pub fn sign_message(&self, message: &str) -> Result<Signature, Error> {
        let prehash = eip191_hash(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&prehash)
            .map_err(|err| Error::Signing(err.to_string()))?;

        let bytes = signature.to_bytes();
        Signature::new(
            *array_ref!(bytes, 0, 32),
            *array_ref!(bytes, 32, 32),
            27 + recovery_id.to_byte(),
        )
        .map_err(Error::Parse)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "Please sign this message to update account A1:\nBlockchain: B2\nNonce: 0";

    #[test]
    fn sign_then_recover_round_trip() {
        let key_pair = KeyPair::generate();
        let signature = key_pair.sign_message(MESSAGE).unwrap();

        assert!(matches!(signature.v(), 27 | 28));
        let recovered = recover_address(MESSAGE, &signature).unwrap();
        assert_eq!(recovered, key_pair.address());
    }

    #[test]
    fn tampered_message_recovers_someone_else() {
        let key_pair = KeyPair::generate();
        let signature = key_pair.sign_message(MESSAGE).unwrap();

        let recovered = recover_address("another message entirely", &signature);
        // Recovery rarely fails outright, but it must not yield the signer.
        if let Ok(address) = recovered {
            assert_ne!(address, key_pair.address());
        }
    }

    #[test]
    fn seeded_keypair_is_deterministic() {
        let a = KeyPair::from_seed(b"deterministic seed".to_vec());
        let b = KeyPair::from_seed(b"deterministic seed".to_vec());
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn compact_and_hex_round_trip() {
        let signature = KeyPair::generate().sign_message(MESSAGE).unwrap();

        let reparsed = Signature::from_bytes(&signature.to_bytes()).unwrap();
        assert_eq!(signature, reparsed);

        let reparsed = Signature::from_hex(signature.to_string()).unwrap();
        assert_eq!(signature, reparsed);
    }

    #[test]
    fn rejects_invalid_recovery_value() {
        let signature = KeyPair::generate().sign_message(MESSAGE).unwrap();
        let mut payload = signature.to_bytes().to_vec();
        payload[64] = 3;
        assert!(Signature::from_bytes(&payload).is_err());
    }

    #[test]
    fn normalizes_the_yparity_recovery_form() {
        let key_pair = KeyPair::from_seed(b"yparity".to_vec());
        let signature = key_pair.sign_message(MESSAGE).unwrap();
        let mut payload = signature.to_bytes().to_vec();
        payload[64] -= 27;

        let reparsed = Signature::from_bytes(&payload).unwrap();
        assert_eq!(reparsed, signature);
        assert_eq!(
            recover_address(MESSAGE, &reparsed).unwrap(),
            key_pair.address()
        );
    }

    #[test]
    fn serde_as_hex_string() {
        let signature = KeyPair::from_seed(b"serde".to_vec())
            .sign_message(MESSAGE)
            .unwrap();
        let json = serde_json::to_string(&signature).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(signature, back);
    }
}
