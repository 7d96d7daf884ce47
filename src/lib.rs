//! Secure-Element Entropy Library
//!
//! A random method for a TLS library's PRNG subsystem that reseeds a
//! software generator from a secure element's true random number
//! generator.
//!
//! # Architecture
//!
//! ```text
//! host ─→ method (slot table) ─→ adapter ─→ software PRNG ─→ output
//!                                   │              ↑
//!                                   └─→ device ────┘ (once per byte quota)
//! ```
//!
//! # Design Principles
//!
//! - **Hardware seeds, software produces**: hardware bytes are never
//!   copied into output; they are mixed into the software generator
//! - **Bounded output per seed**: at most one quota's worth of bytes
//!   before the next hardware reseed is attempted
//! - **Fail per call**: a failed hardware session fails that request
//!   with no output and no retry
//! - **Capability at construction**: hardware-backed or software-only
//!   is a runtime choice, not a build flag
//!
//! # Example
//!
//! ```no_run
//! use se_entropy::{
//!     adapter::{EntropyAdapter, RandConfig},
//!     device::{DeviceConfig, MockSecureElement},
//!     method::{RandEngine, RandMethod},
//!     software::ChaChaPrng,
//! };
//!
//! let adapter = EntropyAdapter::hardware(
//!     ChaChaPrng::from_os_entropy(),
//!     MockSecureElement::new(0),
//!     DeviceConfig::default(),
//!     &RandConfig::default(),
//! );
//! let mut engine = RandEngine::new(adapter);
//! engine.init();
//!
//! let mut buf = [0u8; 32];
//! engine.bytes(&mut buf).unwrap();
//! assert!(engine.status());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod device;
pub mod method;
pub mod metrics;
pub mod software;

// Re-export commonly used types at crate root
pub use adapter::{ByteQuotaCounter, Capability, EntropyAdapter, RandConfig, RandError};
pub use device::{DeviceConfig, DeviceError, FileConfig, MockSecureElement, SecureElement};
pub use method::{MethodTable, RandEngine, RandMethod, Slot};
pub use software::{ChaChaPrng, SoftwareRng};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
