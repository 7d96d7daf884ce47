//! Entropy adapter.
//!
//! Intercepts byte-generation requests, blends hardware entropy into a
//! software generator once per byte quota, and reports whether the
//! current quota has been overrun.

mod counter;
mod entropy;

pub use counter::ByteQuotaCounter;
pub use entropy::{
    AdapterStats, Backend, Capability, EntropyAdapter, RandConfig, RandError,
    DEFAULT_MAX_BYTES_PER_RESEED,
};
