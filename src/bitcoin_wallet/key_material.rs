//! The single private key a transfer is built from, and its taproot tweak.
//!
//! A [`KeyMaterial`] is created per operation from the hex string handed over by a
//! [`KeySupplier`], using the secp256k1 context owned by the caller. Nothing here caches
//! across keys: a different key means a new instance, so the public key and the tweak
//! always belong to the scalar they sit next to.

use std::fmt;

use async_trait::async_trait;
use bitcoin::{
    schnorr::{TapTweak, TweakedPublicKey},
    secp256k1::{constants::SECRET_KEY_SIZE, All, Secp256k1, SecretKey},
    util::taproot::TapTweakHash,
    KeyPair, PublicKey, XOnlyPublicKey,
};
use log::{debug, warn};
use zeroize::Zeroizing;

use super::{
    constants::Seed,
    error::{Result, WalletError},
};

#[derive(Clone)]
pub struct KeyMaterial {
    key_pair: KeyPair,
    tweaked: TweakedKeyPair,
}

impl KeyMaterial {
    /// Decodes a 32 byte hex scalar, with or without a `0x` prefix.
    pub fn new(secp: &Secp256k1<All>, raw_hex: &str) -> Result<Self> {
        let trimmed = raw_hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(WalletError::InvalidKey("empty key".to_string()));
        }

        let mut seed: Zeroizing<Seed> = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        hex::decode_to_slice(digits, &mut seed[..]).map_err(|err| {
            WalletError::InvalidKey(format!(
                "expected {} hex digits ({})",
                SECRET_KEY_SIZE * 2,
                err
            ))
        })?;

        let secret_key = SecretKey::from_slice(&seed[..]).map_err(|_| {
            WalletError::InvalidKey("scalar is zero or not below the curve order".to_string())
        })?;

        let key_pair = KeyPair::from_secret_key(secp, &secret_key);
        let internal_key = key_pair.x_only_public_key().0;
        let tweaked = key_pair.tap_tweak(secp, None).to_inner();
        let (output_key, _) = tweaked.x_only_public_key();
        debug!("tweaked internal key {} to output key {}", internal_key, output_key);
        return Ok(KeyMaterial {
            key_pair,
            tweaked: TweakedKeyPair {
                key_pair: tweaked,
                internal_key,
                output_key: TweakedPublicKey::dangerous_assume_tweaked(output_key),
            },
        });
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> PublicKey {
        return PublicKey::new(self.key_pair.public_key());
    }

    /// Taproot internal key.
    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        return self.key_pair.x_only_public_key().0;
    }

    /// `tagged_hash("TapTweak", internal_key)`, key-path only so no merkle root.
    pub fn tap_tweak(&self) -> TapTweakHash {
        return TapTweakHash::from_key_and_tweak(self.x_only_public_key(), None);
    }

    /// Computed once in [`KeyMaterial::new`]; the untweaked pair is left as it is.
    pub fn tweaked_key_pair(&self) -> TweakedKeyPair {
        return self.tweaked;
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &self.public_key())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// A key pair whose secret and public halves both carry the TapTweak.
///
/// The x-only public half is the taproot output key: the one committed to by the
/// address and the one the key-path signature verifies against.
#[derive(Clone, Copy)]
pub struct TweakedKeyPair {
    key_pair: KeyPair,
    internal_key: XOnlyPublicKey,
    output_key: TweakedPublicKey,
}

impl TweakedKeyPair {
    pub fn output_key(&self) -> TweakedPublicKey {
        return self.output_key;
    }

    pub fn internal_key(&self) -> XOnlyPublicKey {
        return self.internal_key;
    }

    pub(crate) fn key_pair(&self) -> &KeyPair {
        return &self.key_pair;
    }
}

impl fmt::Debug for TweakedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweakedKeyPair")
            .field("internal_key", &self.internal_key)
            .field("output_key", &self.output_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Hands out the raw private key, e.g. an identity provider or the environment.
#[async_trait]
pub trait KeySupplier: Send + Sync {
    async fn private_key_hex(&self) -> Result<String>;
}

pub struct EnvKeySupplier {
    var: String,
}

impl EnvKeySupplier {
    pub fn new(var: &str) -> Self {
        return EnvKeySupplier {
            var: var.to_string(),
        };
    }
}

#[async_trait]
impl KeySupplier for EnvKeySupplier {
    async fn private_key_hex(&self) -> Result<String> {
        return std::env::var(&self.var)
            .map_err(|err| WalletError::KeyUnavailable(format!("{}: {}", self.var, err)));
    }
}

pub struct StaticKeySupplier(Option<String>);

impl StaticKeySupplier {
    pub fn new(raw_hex: Option<&str>) -> Self {
        return StaticKeySupplier(raw_hex.map(|s| s.to_string()));
    }
}

#[async_trait]
impl KeySupplier for StaticKeySupplier {
    async fn private_key_hex(&self) -> Result<String> {
        return self
            .0
            .clone()
            .ok_or_else(|| WalletError::KeyUnavailable("no key configured".to_string()));
    }
}

/// Whether a usable key is in hand.
pub enum KeyState {
    /// Supplier failed or has nothing yet. Carries the reason.
    Pending(String),
    Ready(KeyMaterial),
}

impl KeyState {
    /// Asks the supplier once. Failures and empty answers become `Pending`; a
    /// non-empty answer that does not decode is an `InvalidKey` error.
    pub async fn resolve<S: KeySupplier + ?Sized>(
        secp: &Secp256k1<All>,
        supplier: &S,
    ) -> Result<KeyState> {
        match supplier.private_key_hex().await {
            Ok(raw) => {
                let raw = Zeroizing::new(raw);
                if raw.trim().is_empty() {
                    warn!("key supplier returned an empty key");
                    return Ok(KeyState::Pending("key supplier returned an empty key".to_string()));
                }
                return KeyMaterial::new(secp, &raw).map(KeyState::Ready);
            }
            Err(err) => {
                warn!("key supplier failed: {}", err);
                return Ok(KeyState::Pending(err.to_string()));
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        return matches!(self, KeyState::Ready(_));
    }

    pub fn key_material(&self) -> Result<&KeyMaterial> {
        match self {
            KeyState::Ready(key) => Ok(key),
            KeyState::Pending(reason) => Err(WalletError::KeyUnavailable(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use bitcoin_hashes::{sha256, Hash, HashEngine};

    use super::*;

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const SEED: &str = "1d454c6ab705f999d97e6465300a79a9595fb5ae1186ae20e33e12bea606c094";

    fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
        let tag_hash = sha256::Hash::hash(tag.as_bytes());
        let mut engine = sha256::Hash::engine();
        engine.input(&tag_hash[..]);
        engine.input(&tag_hash[..]);
        engine.input(msg);
        return sha256::Hash::from_engine(engine).into_inner();
    }

    #[test]
    fn public_key_of_one_is_generator() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, KEY_ONE).unwrap();
        assert_eq!(
            key.public_key().to_string(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            key.x_only_public_key().to_string(),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn tap_tweak_is_tagged_hash_of_internal_key() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let expected = tagged_hash("TapTweak", &key.x_only_public_key().serialize());
        assert_eq!(key.tap_tweak().into_inner(), expected);
    }

    #[test]
    fn tweaked_pair_matches_public_tweak() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let (expected, _) = key.x_only_public_key().tap_tweak(&secp, None);

        let tweaked = key.tweaked_key_pair();
        assert_eq!(tweaked.output_key(), expected);
        assert_eq!(tweaked.internal_key(), key.x_only_public_key());
        assert_ne!(tweaked.output_key().to_inner(), key.x_only_public_key());
        assert_eq!(
            tweaked.key_pair().x_only_public_key().0,
            tweaked.output_key().to_inner()
        );
    }

    #[test]
    fn tweaked_pair_is_deterministic() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let first = key.tweaked_key_pair();
        let second = key.tweaked_key_pair();
        assert_eq!(first.output_key(), second.output_key());
        assert_eq!(
            first.key_pair().secret_bytes(),
            second.key_pair().secret_bytes()
        );
        // the untweaked key is left alone
        assert_eq!(
            key.x_only_public_key(),
            KeyMaterial::new(&secp, SEED).unwrap().x_only_public_key()
        );
    }

    #[test]
    fn accepts_0x_prefix() {
        let secp = Secp256k1::new();
        let plain = KeyMaterial::new(&secp, SEED).unwrap();
        let prefixed = KeyMaterial::new(&secp, &format!("0x{}", SEED)).unwrap();
        assert_eq!(plain.public_key(), prefixed.public_key());
    }

    #[test]
    fn rejects_bad_keys() {
        let secp = Secp256k1::new();
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        let zero = "0000000000000000000000000000000000000000000000000000000000000000";
        for raw in [
            "",
            "   ",
            "0x",
            "not hex at all",
            "zz454c6ab705f999d97e6465300a79a9595fb5ae1186ae20e33e12bea606c094",
            "1d454c6ab705f999d97e6465300a79a9595fb5ae1186ae20e33e12bea606c0",
            "1d454c6ab705f999d97e6465300a79a9595fb5ae1186ae20e33e12bea606c09400",
            "abc",
            zero,
            order,
        ] {
            match KeyMaterial::new(&secp, raw) {
                Err(WalletError::InvalidKey(_)) => {}
                other => panic!("{:?} decoded to {:?}", raw, other.map(|k| k.public_key())),
            }
        }
    }

    #[test]
    fn debug_output_hides_secret() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let printed = format!("{:?} {:?}", key, key.tweaked_key_pair());
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains(SEED));
        assert!(!printed.contains(&SEED[..16]));
    }

    #[tokio::test]
    async fn resolve_maps_missing_key_to_pending() {
        let secp = Secp256k1::new();
        let state = KeyState::resolve(&secp, &StaticKeySupplier::new(None)).await.unwrap();
        assert!(!state.is_ready());
        assert!(matches!(state.key_material(), Err(WalletError::KeyUnavailable(_))));

        let state = KeyState::resolve(&secp, &StaticKeySupplier::new(Some(""))).await.unwrap();
        assert!(matches!(state, KeyState::Pending(_)));
    }

    #[tokio::test]
    async fn resolve_decodes_supplied_key() {
        let secp = Secp256k1::new();
        let state = KeyState::resolve(&secp, &StaticKeySupplier::new(Some(SEED)))
            .await
            .unwrap();
        let key = state.key_material().unwrap();
        assert_eq!(key.public_key(), KeyMaterial::new(&secp, SEED).unwrap().public_key());

        let bad = KeyState::resolve(&secp, &StaticKeySupplier::new(Some("xyz"))).await;
        assert!(matches!(bad, Err(WalletError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn env_supplier_without_variable_is_pending() {
        let secp = Secp256k1::new();
        let supplier = EnvKeySupplier::new("KEYPATH_WALLET_TEST_UNSET_VARIABLE");
        let state = KeyState::resolve(&secp, &supplier).await.unwrap();
        assert!(matches!(state, KeyState::Pending(_)));
    }
}
