//! Secure-element trait and random block type.
//!
//! Real hardware and mock implementations both sit behind
//! [`SecureElement`], so the adapter never knows which one it talks to.

use super::DeviceConfig;
use thiserror::Error;

/// Size in bytes of one hardware random fetch.
pub const RANDOM_BLOCK_SIZE: usize = 32;

/// Errors reported by a secure element.
///
/// Mirrors the driver's status enumeration; every variant is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("secure element not found: {0}")]
    NotFound(String),
    #[error("communication failure: {0}")]
    CommFailure(String),
    #[error("device timed out")]
    Timeout,
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
    #[error("no open session")]
    SessionNotOpen,
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),
}

/// The three outbound calls of one hardware session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Acquiring the session.
    Open,
    /// Requesting the random block.
    Fetch,
    /// Releasing the session.
    Close,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Open => "open",
            SessionPhase::Fetch => "fetch",
            SessionPhase::Close => "close",
        };
        f.write_str(name)
    }
}

/// One block of hardware random output.
#[derive(Clone, PartialEq, Eq)]
pub struct RandomBlock([u8; RANDOM_BLOCK_SIZE]);

impl RandomBlock {
    /// Wraps raw bytes returned by the device.
    pub fn new(bytes: [u8; RANDOM_BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the block bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; RANDOM_BLOCK_SIZE] {
        &self.0
    }

    /// Returns the first 32 bits of the block, little-endian.
    #[inline]
    pub fn first_word(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl std::fmt::Debug for RandomBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomBlock")
            .field("len", &RANDOM_BLOCK_SIZE)
            .finish_non_exhaustive()
    }
}

/// Trait for secure-element implementations.
///
/// A session is opened, used for exactly one random fetch and closed
/// again. Every call blocks until the device answers.
pub trait SecureElement {
    /// Acquires a session with the device.
    fn open(&mut self, config: &DeviceConfig) -> Result<(), DeviceError>;

    /// Requests one random block from an open session.
    fn random(&mut self) -> Result<RandomBlock, DeviceError>;

    /// Releases the session.
    fn close(&mut self) -> Result<(), DeviceError>;

    /// Checks if a session is currently open.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_word_little_endian() {
        let mut bytes = [0u8; RANDOM_BLOCK_SIZE];
        bytes[..4].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        let block = RandomBlock::new(bytes);
        assert_eq!(block.first_word(), 0x1234_5678);
    }

    #[test]
    fn test_debug_hides_bytes() {
        let block = RandomBlock::new([0xAB; RANDOM_BLOCK_SIZE]);
        let rendered = format!("{:?}", block);
        assert!(!rendered.contains("171"));
        assert!(!rendered.to_lowercase().contains("ab"));
    }
}
