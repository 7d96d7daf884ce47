//! ChaCha20-based software generator.
//!
//! # Mixing Model
//!
//! Added entropy never replaces the state. Each addition hashes:
//! - A domain separator and mix counter
//! - Previous seed material (retained across additions)
//! - The entropy estimate and the caller's buffer
//!
//! and re-keys ChaCha20 from the digest, so a biased or partially
//! predictable input cannot degrade what is already there.

use super::{SoftwareError, SoftwareRng};
use blake3::Hasher as Blake3Hasher;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain separator for mixing operations.
const MIX_DOMAIN: &[u8] = b"se-entropy-mix-v1";

/// Seed length in bytes; also the cap on credited entropy.
const SEED_LEN: usize = 32;

/// Hash used to mix added entropy into the seed material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixAlgorithm {
    /// BLAKE3 - fast, secure, recommended default.
    #[default]
    Blake3,
    /// SHA-256 - widely deployed, conservative choice.
    Sha256,
}

impl MixAlgorithm {
    fn digest(self, parts: &[&[u8]]) -> [u8; SEED_LEN] {
        match self {
            MixAlgorithm::Blake3 => {
                let mut hasher = Blake3Hasher::new();
                for part in parts {
                    hasher.update(part);
                }
                *hasher.finalize().as_bytes()
            }
            MixAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                let result = hasher.finalize();
                let mut data = [0u8; SEED_LEN];
                data.copy_from_slice(&result);
                data
            }
        }
    }
}

/// A software generator backed by ChaCha20.
///
/// Starts from OS entropy (or a fixed seed) and absorbs further entropy
/// through [`SoftwareRng::add`]. Output is refused once [`cleanup`]
/// has wiped the state, until enough entropy is credited again.
///
/// [`cleanup`]: SoftwareRng::cleanup
pub struct ChaChaPrng {
    /// The underlying ChaCha20 CSPRNG.
    inner: ChaCha20Rng,
    /// Retained seed material for mixing.
    /// This is NOT the ChaCha internal state.
    seed_material: [u8; SEED_LEN],
    /// Hash used for mixing.
    algorithm: MixAlgorithm,
    /// Credited entropy in bytes, capped at the seed length.
    entropy: f64,
    /// Credited entropy required before output is allowed.
    min_entropy: f64,
    /// Total mix operations performed.
    mix_count: u64,
    /// Bytes generated since the last mix.
    bytes_since_mix: u64,
}

impl ChaChaPrng {
    /// Creates a generator seeded from the OS entropy source.
    pub fn from_os_entropy() -> Self {
        let mut seed = [0u8; SEED_LEN];
        rand_core::OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Creates a generator from a known seed.
    ///
    /// Output is fully determined by the seed and the sequence of
    /// operations, which makes runs reproducible.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            inner: ChaCha20Rng::from_seed(seed),
            seed_material: seed,
            algorithm: MixAlgorithm::default(),
            entropy: SEED_LEN as f64,
            min_entropy: SEED_LEN as f64,
            mix_count: 0,
            bytes_since_mix: 0,
        }
    }

    /// Selects the mixing hash.
    pub fn with_algorithm(mut self, algorithm: MixAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the credited entropy (in bytes) required for output.
    pub fn with_min_entropy(mut self, min_entropy: f64) -> Self {
        self.min_entropy = min_entropy.clamp(0.0, SEED_LEN as f64);
        self
    }

    /// Returns the number of mix operations performed.
    pub fn mix_count(&self) -> u64 {
        self.mix_count
    }

    /// Returns bytes generated since the last mix.
    pub fn bytes_since_mix(&self) -> u64 {
        self.bytes_since_mix
    }

    /// Returns the currently credited entropy in bytes.
    pub fn entropy(&self) -> f64 {
        self.entropy
    }
}

impl SoftwareRng for ChaChaPrng {
    fn seed(&mut self, buf: &[u8]) {
        self.add(buf, buf.len() as f64);
    }

    fn bytes(&mut self, buf: &mut [u8]) -> Result<(), SoftwareError> {
        if !self.status() {
            return Err(SoftwareError::NotSeeded);
        }
        self.inner.fill_bytes(buf);
        self.bytes_since_mix += buf.len() as u64;
        Ok(())
    }

    fn add(&mut self, buf: &[u8], entropy: f64) {
        // new_seed = H(domain || counter || old_seed_material || entropy || buf)
        let estimate = if entropy.is_finite() { entropy.max(0.0) } else { 0.0 };
        let new_seed_material = self.algorithm.digest(&[
            MIX_DOMAIN,
            &self.mix_count.to_le_bytes(),
            &self.seed_material,
            &estimate.to_le_bytes(),
            buf,
        ]);

        self.seed_material = new_seed_material;
        self.inner = ChaCha20Rng::from_seed(new_seed_material);
        self.entropy = (self.entropy + estimate).min(SEED_LEN as f64);
        self.mix_count += 1;
        self.bytes_since_mix = 0;

        tracing::trace!(
            mix_count = self.mix_count,
            input_len = buf.len(),
            entropy = self.entropy,
            "Mixed entropy into software PRNG"
        );
    }

    fn cleanup(&mut self) {
        self.seed_material = [0u8; SEED_LEN];
        self.inner = ChaCha20Rng::from_seed(self.seed_material);
        self.entropy = 0.0;
        self.bytes_since_mix = 0;
        tracing::debug!("Software PRNG state wiped");
    }

    fn status(&self) -> bool {
        self.entropy >= self.min_entropy
    }
}
