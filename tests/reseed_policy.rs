//! Reseed policy of the hardware-backed random method.

use se_entropy::adapter::{EntropyAdapter, RandConfig, RandError};
use se_entropy::device::{DeviceConfig, FailureMode, MockSecureElement, SessionPhase};
use se_entropy::method::{return_code, Provider, RandEngine, RandMethod, Slot};
use se_entropy::software::{ChaChaPrng, SoftwareRng};

const MAX: u64 = 128;

fn hardware_engine() -> RandEngine<ChaChaPrng, MockSecureElement> {
    let adapter = EntropyAdapter::hardware(
        ChaChaPrng::from_seed([0x10; 32]),
        MockSecureElement::new(42),
        DeviceConfig::default(),
        &RandConfig {
            max_bytes_per_reseed: MAX,
            ..Default::default()
        },
    );
    let mut engine = RandEngine::new(adapter);
    assert!(engine.init());
    engine
}

fn fetches(engine: &RandEngine<ChaChaPrng, MockSecureElement>) -> u64 {
    engine
        .with_adapter(|a| a.device().map(|d| d.fetches()).unwrap_or(0))
        .unwrap()
}

fn total(engine: &RandEngine<ChaChaPrng, MockSecureElement>) -> u64 {
    engine.with_adapter(|a| a.counter().total()).unwrap()
}

#[test]
fn test_quota_sum_reseeds_once_then_again_after_overflow() {
    let engine = hardware_engine();
    let mut buf = [0u8; 32];

    // Four requests summing to exactly MAX share one reseed.
    for _ in 0..4 {
        engine.bytes(&mut buf).unwrap();
    }
    assert_eq!(fetches(&engine), 1);
    assert_eq!(total(&engine), MAX);

    // Reaching MAX is not exceeding it; this request still rides the old seed.
    engine.bytes(&mut buf).unwrap();
    assert_eq!(fetches(&engine), 1);
    assert_eq!(total(&engine), MAX + 32);

    // The first request after the overflow starts a new cycle.
    engine.bytes(&mut buf).unwrap();
    assert_eq!(fetches(&engine), 2);
    assert_eq!(total(&engine), 32);
}

#[test]
fn test_triggering_failure_writes_nothing_and_counts_nothing() {
    let engine = hardware_engine();
    engine
        .with_adapter(|a| {
            if let Some(device) = a.device_mut() {
                device.fail(SessionPhase::Open, FailureMode::Once);
            }
        })
        .unwrap();

    let mut buf = [0xEEu8; 48];
    let result = engine.bytes(&mut buf);

    assert_eq!(return_code(&result), 0);
    assert!(matches!(
        result,
        Err(RandError::Hardware {
            phase: SessionPhase::Open,
            ..
        })
    ));
    assert_eq!(buf, [0xEEu8; 48]);
    assert_eq!(total(&engine), 0);
}

#[test]
fn test_failure_mid_cycle_cannot_happen() {
    let engine = hardware_engine();
    engine.bytes(&mut [0u8; 16]).unwrap();

    engine
        .with_adapter(|a| {
            if let Some(device) = a.device_mut() {
                device.fail(SessionPhase::Fetch, FailureMode::Always);
            }
        })
        .unwrap();

    // Hardware is not consulted until the quota runs over.
    assert!(engine.bytes(&mut [0u8; 16]).is_ok());
    assert!(engine.bytes(&mut [0u8; 100]).is_ok());
    assert!(engine.bytes(&mut [0u8; 16]).is_err());
}

#[test]
fn test_status_healthy_within_quota() {
    let engine = hardware_engine();
    assert!(engine.status());

    engine.bytes(&mut [0u8; MAX as usize]).unwrap();
    assert!(engine.status());
}

#[test]
fn test_status_unhealthy_is_reachable() {
    let engine = hardware_engine();

    // One request crossing the threshold leaves the total above MAX
    // until the next request resets it.
    engine.bytes(&mut [0u8; MAX as usize + 1]).unwrap();
    assert!(!engine.status());

    engine.bytes(&mut [0u8; 1]).unwrap();
    assert!(engine.status());
}

#[test]
fn test_pseudorand_shares_the_quota() {
    let engine = hardware_engine();
    engine.bytes(&mut [0u8; 64]).unwrap();
    engine.pseudorand(&mut [0u8; 64]).unwrap();
    assert_eq!(total(&engine), 128);
    assert_eq!(fetches(&engine), 1);
}

#[test]
fn test_init_populates_seed_and_cleanup_for_both_capabilities() {
    let hardware = hardware_engine();
    let mut software: RandEngine<ChaChaPrng, MockSecureElement> =
        RandEngine::new(EntropyAdapter::software_only(
            ChaChaPrng::from_seed([0x10; 32]),
            &RandConfig::default(),
        ));
    assert!(software.init());

    for engine_table in [hardware.table(), software.table()] {
        assert_eq!(engine_table.provider(Slot::Seed), Some(Provider::Software));
        assert_eq!(engine_table.provider(Slot::Cleanup), Some(Provider::Software));
    }
}

#[test]
fn test_reseeded_output_tracks_device_stream() {
    // Same software seed and device seed give the same output.
    let a = hardware_engine();
    let b = hardware_engine();
    let mut out_a = [0u8; 64];
    let mut out_b = [0u8; 64];
    a.bytes(&mut out_a).unwrap();
    b.bytes(&mut out_b).unwrap();
    assert_eq!(out_a, out_b);

    // A different device stream changes it.
    let c = RandEngine::new(EntropyAdapter::hardware(
        ChaChaPrng::from_seed([0x10; 32]),
        MockSecureElement::new(43),
        DeviceConfig::default(),
        &RandConfig {
            max_bytes_per_reseed: MAX,
            ..Default::default()
        },
    ));
    let mut out_c = [0u8; 64];
    c.bytes(&mut out_c).unwrap();
    assert_ne!(out_a, out_c);
}

#[test]
fn test_software_seed_slot_reaches_generator() {
    let engine = hardware_engine();
    engine.cleanup().unwrap();
    assert!(!engine.with_adapter(|a| a.software().status()).unwrap());

    engine.seed(&[0x77; 32]).unwrap();
    assert!(engine.with_adapter(|a| a.software().status()).unwrap());
}
