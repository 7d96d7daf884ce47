//! Hardware-reseeded byte generation.
//!
//! The secure element is never used to fill output buffers. Once per
//! byte quota it supplies one random block, which is mixed into the
//! software generator; the software generator then produces every
//! byte. One hardware round-trip is thereby amortized across many
//! requests, and the number of bytes drawn from one hardware seed
//! stays bounded.

use super::ByteQuotaCounter;
use crate::device::{ConfigError, DeviceConfig, DeviceError, RandomBlock, SecureElement, SessionPhase};
use crate::method::Slot;
use crate::software::{MixAlgorithm, SoftwareError, SoftwareRng};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of bytes produced per hardware reseed.
pub const DEFAULT_MAX_BYTES_PER_RESEED: u64 = 4096;

/// Errors returned by random byte generation.
#[derive(Debug, Error)]
pub enum RandError {
    /// The hardware session failed; no bytes were produced.
    #[error("hardware {phase} failed: {source}")]
    Hardware {
        /// Call that failed.
        phase: SessionPhase,
        /// Device status.
        #[source]
        source: DeviceError,
    },
    /// The software generator failed.
    #[error(transparent)]
    Software(#[from] SoftwareError),
    #[error("random method slot `{0}` is not set")]
    SlotUnset(Slot),
    #[error("random method state lock poisoned")]
    Poisoned,
}

/// Configuration of the reseed policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandConfig {
    /// Bytes produced from one hardware seed before the next reseed.
    pub max_bytes_per_reseed: u64,
    /// Hash used by the software generator to mix entropy.
    ///
    /// Not read by [`EntropyAdapter`]; pass it to the generator, e.g.
    /// [`ChaChaPrng::with_algorithm`](crate::software::ChaChaPrng::with_algorithm).
    pub mix: MixAlgorithm,
}

impl Default for RandConfig {
    fn default() -> Self {
        Self {
            max_bytes_per_reseed: DEFAULT_MAX_BYTES_PER_RESEED,
            mix: MixAlgorithm::default(),
        }
    }
}

impl RandConfig {
    /// Validates the policy parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes_per_reseed == 0 {
            return Err(ConfigError::InvalidQuota);
        }
        Ok(())
    }
}

/// Which behavior the random method provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Bytes are produced by a software generator reseeded from hardware.
    HardwareBacked,
    /// Everything is passed through to the software generator.
    SoftwareOnly,
}

/// Source of reseed entropy, fixed at construction.
pub enum Backend<D> {
    /// A secure element and the settings used to reach it.
    Hardware { device: D, config: DeviceConfig },
    /// No hardware; pure pass-through.
    SoftwareOnly,
}

/// Counters describing adapter activity.
#[derive(Debug, Clone, Default)]
pub struct AdapterStats {
    /// Byte-generation requests received (zero-length ones excluded).
    pub requests: u64,
    /// Bytes successfully produced.
    pub bytes_generated: u64,
    /// Successful hardware reseeds.
    pub hardware_reseeds: u64,
    /// Failed hardware sessions.
    pub hardware_failures: u64,
    /// Software generator failures.
    pub software_failures: u64,
    /// Time of the last successful hardware reseed.
    pub last_reseed: Option<DateTime<Utc>>,
}

/// Adapter that reseeds a software generator from a secure element.
pub struct EntropyAdapter<S, D> {
    software: S,
    backend: Backend<D>,
    counter: ByteQuotaCounter,
    stats: AdapterStats,
}

impl<S: SoftwareRng, D: SecureElement> EntropyAdapter<S, D> {
    /// Creates a hardware-backed adapter.
    pub fn hardware(software: S, device: D, device_config: DeviceConfig, config: &RandConfig) -> Self {
        Self::new(
            software,
            Backend::Hardware {
                device,
                config: device_config,
            },
            config,
        )
    }

    /// Creates an adapter that passes everything to `software`.
    pub fn software_only(software: S, config: &RandConfig) -> Self {
        Self::new(software, Backend::SoftwareOnly, config)
    }

    /// Creates an adapter over an explicit backend.
    ///
    /// Only `config.max_bytes_per_reseed` is used here; `config.mix`
    /// configures the software generator, which arrives already built.
    pub fn new(software: S, backend: Backend<D>, config: &RandConfig) -> Self {
        Self {
            software,
            backend,
            counter: ByteQuotaCounter::new(config.max_bytes_per_reseed),
            stats: AdapterStats::default(),
        }
    }

    /// Returns the capability selected at construction.
    pub fn capability(&self) -> Capability {
        match self.backend {
            Backend::Hardware { .. } => Capability::HardwareBacked,
            Backend::SoftwareOnly => Capability::SoftwareOnly,
        }
    }

    /// Fills `buf` with random bytes.
    ///
    /// With hardware, the first request of every quota cycle runs one
    /// hardware session and mixes its block into the software
    /// generator. If that session fails the request fails: `buf` is
    /// left untouched and the quota is not charged. An empty `buf` is
    /// a successful no-op.
    pub fn bytes(&mut self, buf: &mut [u8]) -> Result<(), RandError> {
        if buf.is_empty() {
            return Ok(());
        }
        self.stats.requests += 1;

        match self.backend {
            Backend::Hardware { .. } => {
                if self.counter.begin_request() {
                    tracing::trace!(len = buf.len(), "rand bytes - hw");
                    self.reseed_from_hardware()?;
                }
                self.counter.record(buf.len());
            }
            Backend::SoftwareOnly => {
                tracing::trace!(len = buf.len(), "rand bytes - sw");
            }
        }

        if let Err(err) = self.software.bytes(buf) {
            self.stats.software_failures += 1;
            return Err(err.into());
        }
        self.stats.bytes_generated += buf.len() as u64;
        Ok(())
    }

    /// Accounts for a request served by the software generator directly.
    ///
    /// Used when the method table routes byte slots past the adapter;
    /// the quota counter is not involved.
    pub fn record_passthrough(&mut self, len: usize, result: &Result<(), SoftwareError>) {
        if len == 0 {
            return;
        }
        self.stats.requests += 1;
        match result {
            Ok(()) => self.stats.bytes_generated += len as u64,
            Err(_) => self.stats.software_failures += 1,
        }
    }

    /// Fills `buf` with pseudorandom bytes; identical to [`bytes`](Self::bytes).
    pub fn pseudorand(&mut self, buf: &mut [u8]) -> Result<(), RandError> {
        self.bytes(buf)
    }

    /// Returns false once the quota has been exceeded and no request
    /// has started a new cycle yet.
    pub fn status(&self) -> bool {
        !self.counter.exceeded()
    }

    /// Returns the quota counter.
    pub fn counter(&self) -> &ByteQuotaCounter {
        &self.counter
    }

    /// Returns activity counters.
    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    /// Returns the software generator.
    pub fn software(&self) -> &S {
        &self.software
    }

    /// Returns the software generator mutably.
    pub fn software_mut(&mut self) -> &mut S {
        &mut self.software
    }

    /// Returns the secure element, if hardware-backed.
    pub fn device(&self) -> Option<&D> {
        match &self.backend {
            Backend::Hardware { device, .. } => Some(device),
            Backend::SoftwareOnly => None,
        }
    }

    /// Returns the secure element mutably, if hardware-backed.
    pub fn device_mut(&mut self) -> Option<&mut D> {
        match &mut self.backend {
            Backend::Hardware { device, .. } => Some(device),
            Backend::SoftwareOnly => None,
        }
    }

    fn reseed_from_hardware(&mut self) -> Result<(), RandError> {
        let Backend::Hardware { device, config } = &mut self.backend else {
            return Ok(());
        };

        let block = match fetch_block(device, config) {
            Ok(block) => block,
            Err(err) => {
                self.stats.hardware_failures += 1;
                tracing::warn!(error = %err, "Hardware reseed failed");
                return Err(err);
            }
        };

        let entropy = f64::from(block.first_word());
        self.software.add(block.as_bytes(), entropy);

        self.stats.hardware_reseeds += 1;
        self.stats.last_reseed = Some(Utc::now());

        tracing::debug!(
            reseed_count = self.stats.hardware_reseeds,
            max_bytes = self.counter.max(),
            "Software PRNG reseeded from secure element"
        );
        Ok(())
    }
}

/// Runs one open/fetch/close session. The first failure ends it.
fn fetch_block<D: SecureElement>(device: &mut D, config: &DeviceConfig) -> Result<RandomBlock, RandError> {
    device.open(config).map_err(|source| RandError::Hardware {
        phase: SessionPhase::Open,
        source,
    })?;
    let block = device.random().map_err(|source| RandError::Hardware {
        phase: SessionPhase::Fetch,
        source,
    })?;
    device.close().map_err(|source| RandError::Hardware {
        phase: SessionPhase::Close,
        source,
    })?;
    Ok(block)
}

impl<S, D> std::fmt::Debug for EntropyAdapter<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hardware = matches!(self.backend, Backend::Hardware { .. });
        f.debug_struct("EntropyAdapter")
            .field("hardware", &hardware)
            .field("counter", &self.counter)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
