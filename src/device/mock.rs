//! Mock secure element that produces deterministic random blocks.

use super::{DeviceConfig, DeviceError, RandomBlock, SecureElement, SessionPhase, RANDOM_BLOCK_SIZE};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// How an injected failure behaves once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail the next call of the phase, then recover.
    Once,
    /// Fail every call of the phase until cleared.
    Always,
}

/// Mock secure element for testing.
///
/// Blocks come from a seeded ChaCha20 stream, so two mocks with the
/// same seed return the same sequence. Failures can be injected per
/// session phase.
#[derive(Debug)]
pub struct MockSecureElement {
    stream: ChaCha20Rng,
    config: Option<DeviceConfig>,
    failure: Option<(SessionPhase, FailureMode, DeviceError)>,
    opens: u64,
    fetches: u64,
    closes: u64,
}

impl MockSecureElement {
    /// Creates a mock whose blocks are derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            stream: ChaCha20Rng::seed_from_u64(seed),
            config: None,
            failure: None,
            opens: 0,
            fetches: 0,
            closes: 0,
        }
    }

    /// Creates a mock that behaves like a missing device: every open
    /// fails with [`DeviceError::NotFound`].
    pub fn absent(seed: u64) -> Self {
        let mut mock = Self::new(seed);
        mock.fail_with(
            SessionPhase::Open,
            FailureMode::Always,
            DeviceError::NotFound("no secure element on bus".to_string()),
        );
        mock
    }

    /// Injects a communication failure into the given phase.
    pub fn fail(&mut self, phase: SessionPhase, mode: FailureMode) {
        let error = DeviceError::CommFailure(format!("injected {} failure", phase));
        self.fail_with(phase, mode, error);
    }

    /// Injects `error` into the given phase.
    pub fn fail_with(&mut self, phase: SessionPhase, mode: FailureMode, error: DeviceError) {
        self.failure = Some((phase, mode, error));
    }

    /// Removes any injected failure.
    pub fn clear_failure(&mut self) {
        self.failure = None;
    }

    /// Number of successful session opens.
    pub fn opens(&self) -> u64 {
        self.opens
    }

    /// Number of successful random fetches.
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Number of successful session closes.
    pub fn closes(&self) -> u64 {
        self.closes
    }

    fn check(&mut self, phase: SessionPhase) -> Result<(), DeviceError> {
        let error = match &self.failure {
            Some((failing, mode, error)) if *failing == phase => {
                let error = error.clone();
                if *mode == FailureMode::Once {
                    self.failure = None;
                }
                error
            }
            _ => return Ok(()),
        };
        tracing::debug!(%phase, %error, "MockSecureElement injected failure");
        Err(error)
    }
}

impl Default for MockSecureElement {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SecureElement for MockSecureElement {
    fn open(&mut self, config: &DeviceConfig) -> Result<(), DeviceError> {
        config
            .validate()
            .map_err(|e| DeviceError::InvalidConfig(e.to_string()))?;
        self.check(SessionPhase::Open)?;
        self.config = Some(config.clone());
        self.opens += 1;
        tracing::trace!(address = config.address, "MockSecureElement opened");
        Ok(())
    }

    fn random(&mut self) -> Result<RandomBlock, DeviceError> {
        if self.config.is_none() {
            return Err(DeviceError::SessionNotOpen);
        }
        self.check(SessionPhase::Fetch)?;

        let mut bytes = [0u8; RANDOM_BLOCK_SIZE];
        self.stream.fill_bytes(&mut bytes);
        self.fetches += 1;
        Ok(RandomBlock::new(bytes))
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        if self.config.is_none() {
            return Err(DeviceError::SessionNotOpen);
        }
        self.check(SessionPhase::Close)?;
        self.config = None;
        self.closes += 1;
        tracing::trace!("MockSecureElement closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }
}
