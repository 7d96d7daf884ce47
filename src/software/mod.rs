//! Software PRNG collaborator.
//!
//! The adapter never fills output buffers from hardware directly; it
//! hands hardware entropy to a software generator and lets that
//! generator produce the bytes. This module defines that generator's
//! contract and a ChaCha20-based implementation.

mod chacha;

pub use chacha::{ChaChaPrng, MixAlgorithm};

use thiserror::Error;

/// Errors reported by a software generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftwareError {
    #[error("PRNG not seeded")]
    NotSeeded,
}

/// Operations of a software random method.
///
/// Mirrors the host library's software generator: seeding, entropy
/// addition, byte production, cleanup and status.
pub trait SoftwareRng {
    /// Seeds the generator with `buf`, counting every byte as entropy.
    fn seed(&mut self, buf: &[u8]);

    /// Fills `buf` with random bytes.
    fn bytes(&mut self, buf: &mut [u8]) -> Result<(), SoftwareError>;

    /// Fills `buf` with pseudorandom bytes.
    fn pseudorand(&mut self, buf: &mut [u8]) -> Result<(), SoftwareError> {
        self.bytes(buf)
    }

    /// Mixes `buf` into the state with an entropy estimate in bytes.
    fn add(&mut self, buf: &[u8], entropy: f64);

    /// Wipes the generator state.
    fn cleanup(&mut self);

    /// Returns true if the generator has enough entropy to produce output.
    fn status(&self) -> bool;
}
