//! Host-facing random method.

use super::{MethodTable, Provider, Slot};
use crate::adapter::{EntropyAdapter, RandError};
use crate::device::SecureElement;
use crate::software::SoftwareRng;
use std::sync::{Mutex, MutexGuard};

/// The host library's random method contract.
///
/// The host may call any slot at any time, from any thread.
pub trait RandMethod {
    /// Seeds the generator.
    fn seed(&self, buf: &[u8]) -> Result<(), RandError>;

    /// Fills `buf` with random bytes.
    fn bytes(&self, buf: &mut [u8]) -> Result<(), RandError>;

    /// Wipes generator state.
    fn cleanup(&self) -> Result<(), RandError>;

    /// Adds entropy with a quality estimate in bytes.
    fn add(&self, buf: &[u8], entropy: f64) -> Result<(), RandError>;

    /// Fills `buf` with pseudorandom bytes.
    fn pseudorand(&self, buf: &mut [u8]) -> Result<(), RandError>;

    /// Returns true if the generator is healthy.
    fn status(&self) -> bool;
}

/// Converts a result into the host ABI return code (1 success, 0 failure).
pub fn return_code(result: &Result<(), RandError>) -> i32 {
    match result {
        Ok(()) => 1,
        Err(_) => 0,
    }
}

/// Random method routing host calls through a [`MethodTable`].
///
/// The adapter and its quota counter sit behind a mutex, so concurrent
/// callers cannot race on the counter.
pub struct RandEngine<S, D> {
    table: MethodTable,
    adapter: Mutex<EntropyAdapter<S, D>>,
}

impl<S: SoftwareRng, D: SecureElement> RandEngine<S, D> {
    /// Creates an engine whose table matches the adapter's capability.
    ///
    /// Call [`init`](Self::init) before handing it to the host.
    pub fn new(adapter: EntropyAdapter<S, D>) -> Self {
        Self {
            table: MethodTable::new(adapter.capability()),
            adapter: Mutex::new(adapter),
        }
    }

    /// Fills unset slots from the software generator. Always succeeds.
    pub fn init(&mut self) -> bool {
        tracing::debug!(capability = ?self.table.capability(), "rand method init");
        self.table.init()
    }

    /// Returns the slot table.
    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    /// Runs `f` with exclusive access to the adapter.
    pub fn with_adapter<R>(
        &self,
        f: impl FnOnce(&mut EntropyAdapter<S, D>) -> R,
    ) -> Result<R, RandError> {
        let mut adapter = self.lock()?;
        Ok(f(&mut adapter))
    }

    /// Runs `f` with the adapter and the status this engine would report,
    /// both read under a single lock.
    pub fn snapshot<R>(
        &self,
        f: impl FnOnce(&EntropyAdapter<S, D>, bool) -> R,
    ) -> Result<R, RandError> {
        let adapter = self.lock()?;
        let healthy = self.status_of(&adapter);
        Ok(f(&adapter, healthy))
    }

    fn status_of(&self, adapter: &EntropyAdapter<S, D>) -> bool {
        match self.table.provider(Slot::Status) {
            Some(Provider::Adapter) => adapter.status(),
            Some(Provider::Software) => adapter.software().status(),
            None => false,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, EntropyAdapter<S, D>>, RandError> {
        self.adapter.lock().map_err(|_| RandError::Poisoned)
    }

    fn fill(&self, slot: Slot, buf: &mut [u8]) -> Result<(), RandError> {
        match self.table.provider(slot) {
            Some(Provider::Adapter) => self.lock()?.bytes(buf),
            Some(Provider::Software) => {
                let mut adapter = self.lock()?;
                let software = adapter.software_mut();
                let result = match slot {
                    Slot::PseudoRand => software.pseudorand(buf),
                    _ => software.bytes(buf),
                };
                adapter.record_passthrough(buf.len(), &result);
                result.map_err(RandError::from)
            }
            None => Err(RandError::SlotUnset(slot)),
        }
    }

    // Only the software generator can seed, add or clean up, so any
    // provider on these slots means delegation; an unset slot is skipped.
    fn delegate(&self, slot: Slot, op: impl FnOnce(&mut S)) -> Result<(), RandError> {
        if self.table.provider(slot).is_none() {
            tracing::trace!(%slot, "rand method slot unset, skipping");
            return Ok(());
        }
        op(self.lock()?.software_mut());
        Ok(())
    }
}

impl<S: SoftwareRng, D: SecureElement> RandMethod for RandEngine<S, D> {
    fn seed(&self, buf: &[u8]) -> Result<(), RandError> {
        self.delegate(Slot::Seed, |software| software.seed(buf))
    }

    fn bytes(&self, buf: &mut [u8]) -> Result<(), RandError> {
        self.fill(Slot::Bytes, buf)
    }

    fn cleanup(&self) -> Result<(), RandError> {
        self.delegate(Slot::Cleanup, |software| software.cleanup())
    }

    fn add(&self, buf: &[u8], entropy: f64) -> Result<(), RandError> {
        self.delegate(Slot::Add, |software| software.add(buf, entropy))
    }

    fn pseudorand(&self, buf: &mut [u8]) -> Result<(), RandError> {
        self.fill(Slot::PseudoRand, buf)
    }

    fn status(&self) -> bool {
        tracing::trace!("rand method status");
        match self.lock() {
            Ok(adapter) => self.status_of(&adapter),
            Err(err) => {
                tracing::warn!(error = %err, "rand method status unavailable");
                false
            }
        }
    }
}

impl<S, D> std::fmt::Debug for RandEngine<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandEngine")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Capability, RandConfig};
    use crate::device::{DeviceConfig, MockSecureElement};
    use crate::software::ChaChaPrng;

    fn rand_config(max: u64) -> RandConfig {
        RandConfig {
            max_bytes_per_reseed: max,
            ..Default::default()
        }
    }

    fn hw_engine(max: u64) -> RandEngine<ChaChaPrng, MockSecureElement> {
        RandEngine::new(EntropyAdapter::hardware(
            ChaChaPrng::from_seed([0x02; 32]),
            MockSecureElement::new(1),
            DeviceConfig::default(),
            &rand_config(max),
        ))
    }

    fn sw_engine() -> RandEngine<ChaChaPrng, MockSecureElement> {
        RandEngine::new(EntropyAdapter::software_only(
            ChaChaPrng::from_seed([0x02; 32]),
            &rand_config(64),
        ))
    }

    #[test]
    fn test_uninitialized_seed_is_skipped() {
        let engine = hw_engine(64);
        engine.seed(&[1, 2, 3]).unwrap();
        let mixes = engine.with_adapter(|a| a.software().mix_count()).unwrap();
        assert_eq!(mixes, 0);
    }

    #[test]
    fn test_init_enables_seed_and_cleanup() {
        let mut engine = hw_engine(64);
        assert!(engine.init());

        engine.seed(&[1, 2, 3]).unwrap();
        let mixes = engine.with_adapter(|a| a.software().mix_count()).unwrap();
        assert_eq!(mixes, 1);

        engine.cleanup().unwrap();
        let seeded = engine.with_adapter(|a| a.software().status()).unwrap();
        assert!(!seeded);
    }

    #[test]
    fn test_hardware_add_slot_stays_unset() {
        let mut engine = hw_engine(64);
        engine.init();

        engine.add(&[9; 16], 16.0).unwrap();
        let mixes = engine.with_adapter(|a| a.software().mix_count()).unwrap();
        assert_eq!(mixes, 0);
    }

    #[test]
    fn test_software_only_add_delegates() {
        let mut engine = sw_engine();
        engine.init();

        engine.add(&[9; 16], 16.0).unwrap();
        let mixes = engine.with_adapter(|a| a.software().mix_count()).unwrap();
        assert_eq!(mixes, 1);
    }

    #[test]
    fn test_hardware_bytes_reseed_once() {
        let mut engine = hw_engine(64);
        engine.init();

        let mut buf = [0u8; 16];
        assert_eq!(return_code(&engine.bytes(&mut buf)), 1);
        assert_eq!(return_code(&engine.pseudorand(&mut buf)), 1);

        let fetches = engine
            .with_adapter(|a| a.device().map(|d| d.fetches()))
            .unwrap();
        assert_eq!(fetches, Some(1));
    }

    #[test]
    fn test_software_status_follows_generator() {
        let mut engine = sw_engine();
        engine.init();
        assert!(engine.status());

        engine.cleanup().unwrap();
        assert!(!engine.status());
        assert_eq!(return_code(&engine.bytes(&mut [0u8; 4])), 0);
    }

    #[test]
    fn test_hardware_status_follows_quota() {
        let mut engine = hw_engine(64);
        engine.init();
        assert_eq!(engine.table().capability(), Capability::HardwareBacked);

        engine.bytes(&mut [0u8; 65]).unwrap();
        assert!(!engine.status());

        engine.bytes(&mut [0u8; 1]).unwrap();
        assert!(engine.status());
    }

    #[test]
    fn test_snapshot_reports_status_with_counter() {
        let mut engine = hw_engine(64);
        engine.init();
        engine.bytes(&mut [0u8; 65]).unwrap();

        let (healthy, total) = engine
            .snapshot(|a, healthy| (healthy, a.counter().total()))
            .unwrap();
        assert!(!healthy);
        assert_eq!(total, 65);
    }

    #[test]
    fn test_software_passthrough_is_counted() {
        let mut engine = sw_engine();
        engine.init();

        engine.bytes(&mut [0u8; 32]).unwrap();
        engine.pseudorand(&mut [0u8; 16]).unwrap();
        engine.bytes(&mut []).unwrap();

        let (requests, generated) = engine
            .with_adapter(|a| (a.stats().requests, a.stats().bytes_generated))
            .unwrap();
        assert_eq!((requests, generated), (2, 48));
    }

    #[test]
    fn test_poisoned_lock_fails_closed() {
        let mut engine = hw_engine(64);
        engine.init();
        let engine = std::sync::Arc::new(engine);

        let poisoner = std::sync::Arc::clone(&engine);
        let joined = std::thread::spawn(move || {
            let _ = poisoner.with_adapter(|_| panic!("adapter panicked mid-request"));
        })
        .join();
        assert!(joined.is_err());

        let mut buf = [0x7Eu8; 8];
        assert!(matches!(engine.bytes(&mut buf), Err(RandError::Poisoned)));
        assert!(matches!(engine.pseudorand(&mut buf), Err(RandError::Poisoned)));
        assert!(matches!(engine.seed(&[1, 2, 3]), Err(RandError::Poisoned)));
        assert_eq!(buf, [0x7Eu8; 8]);
        assert!(!engine.status());
        assert!(engine.snapshot(|_, healthy| healthy).is_err());
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let mut engine = hw_engine(1024);
        engine.init();
        let engine = std::sync::Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = std::sync::Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        engine.bytes(&mut [0u8; 16]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (total, fetches) = engine
            .with_adapter(|a| (a.counter().total(), a.device().map(|d| d.fetches())))
            .unwrap();
        assert_eq!(total, 4 * 8 * 16);
        assert_eq!(fetches, Some(1));
    }
}
