//! Secure-element access.
//!
//! This module provides the abstraction over the secure element that
//! supplies true random numbers. The element is only ever asked for one
//! fixed-size random block per session; the command protocol behind
//! that request belongs to the driver, not to this crate.

mod config;
mod element;
mod mock;

pub use config::{ConfigError, DeviceConfig, DeviceType, FileConfig, Interface, OutputConfig};
pub use element::{DeviceError, RandomBlock, SecureElement, SessionPhase, RANDOM_BLOCK_SIZE};
pub use mock::{FailureMode, MockSecureElement};
