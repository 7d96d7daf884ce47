//! Random method slot table.

use crate::adapter::Capability;

/// The six operations of a host random method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Seed the generator.
    Seed,
    /// Produce random bytes.
    Bytes,
    /// Wipe generator state.
    Cleanup,
    /// Add entropy with a quality estimate.
    Add,
    /// Produce pseudorandom bytes.
    PseudoRand,
    /// Report generator health.
    Status,
}

impl Slot {
    /// Every slot, in table order.
    pub const ALL: [Slot; 6] = [
        Slot::Seed,
        Slot::Bytes,
        Slot::Cleanup,
        Slot::Add,
        Slot::PseudoRand,
        Slot::Status,
    ];
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Slot::Seed => "seed",
            Slot::Bytes => "bytes",
            Slot::Cleanup => "cleanup",
            Slot::Add => "add",
            Slot::PseudoRand => "pseudorand",
            Slot::Status => "status",
        };
        f.write_str(name)
    }
}

/// Who serves a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// The entropy adapter.
    Adapter,
    /// The software generator, by delegation.
    Software,
}

/// Slot assignments of a random method.
///
/// A fresh table has the adapter on bytes, pseudorand and status, and
/// nothing on the rest. [`init`](Self::init) fills the gaps from the
/// software generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTable {
    capability: Capability,
    seed: Option<Provider>,
    bytes: Option<Provider>,
    cleanup: Option<Provider>,
    add: Option<Provider>,
    pseudorand: Option<Provider>,
    status: Option<Provider>,
}

impl MethodTable {
    /// Creates the table for a capability.
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            seed: None,
            bytes: Some(Provider::Adapter),
            cleanup: None,
            add: None,
            pseudorand: Some(Provider::Adapter),
            status: Some(Provider::Adapter),
        }
    }

    /// Populates slots by delegation to the software generator.
    ///
    /// Seed and cleanup always come from software. Without hardware
    /// the remaining slots do too, making the method a pure
    /// pass-through. Always succeeds.
    pub fn init(&mut self) -> bool {
        self.seed = Some(Provider::Software);
        self.cleanup = Some(Provider::Software);

        if self.capability == Capability::SoftwareOnly {
            self.bytes = Some(Provider::Software);
            self.add = Some(Provider::Software);
            self.pseudorand = Some(Provider::Software);
            self.status = Some(Provider::Software);
        }

        true
    }

    /// Returns the provider of a slot, or `None` if unset.
    pub fn provider(&self, slot: Slot) -> Option<Provider> {
        match slot {
            Slot::Seed => self.seed,
            Slot::Bytes => self.bytes,
            Slot::Cleanup => self.cleanup,
            Slot::Add => self.add,
            Slot::PseudoRand => self.pseudorand,
            Slot::Status => self.status,
        }
    }

    /// Returns the capability the table was built for.
    pub fn capability(&self) -> Capability {
        self.capability
    }
}
