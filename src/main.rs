//! Secure-Element Entropy CLI
//!
//! Drives the random method against the mock secure element and
//! reports reseed activity.

use clap::Parser;
use se_entropy::{
    adapter::{EntropyAdapter, RandConfig},
    device::{FailureMode, FileConfig, MockSecureElement, SessionPhase},
    method::{return_code, RandEngine, RandMethod},
    metrics::{MetricsRegistry, MetricsSnapshot},
    software::ChaChaPrng,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "se-entropy", version, about = "Secure-element reseeded random method")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run without the secure element (pure software pass-through).
    #[arg(long)]
    software_only: bool,

    /// Bytes requested per call.
    #[arg(long)]
    request_size: Option<usize>,

    /// Number of calls to make.
    #[arg(long)]
    requests: Option<u32>,

    /// Keep generating until interrupted.
    #[arg(long)]
    continuous: bool,

    /// Make the first hardware fetch fail.
    #[arg(long)]
    fail_fetch: bool,

    /// Simulate a missing secure element (every session open fails).
    #[arg(long)]
    no_device: bool,

    /// Seed for the mock secure element.
    #[arg(long, default_value_t = 0)]
    device_seed: u64,

    /// Metrics server port (0 to disable).
    #[arg(long)]
    metrics_port: Option<u16>,
}

type Engine = RandEngine<ChaChaPrng, MockSecureElement>;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    apply_overrides(&mut config, &args);

    info!("Secure-Element Entropy v{}", se_entropy::VERSION);
    info!("This is a demonstration using a mock secure element");

    let engine = build_engine(&config, &args);

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    #[cfg(feature = "metrics")]
    let metrics_state = start_metrics_server(config.output.metrics_port);

    let running = Arc::new(AtomicBool::new(true));
    if config.output.continuous {
        let flag = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let mut buf = vec![0u8; config.output.request_size];
    let mut succeeded = 0u64;
    let mut failed = 0u64;
    let mut call = 0u64;

    while running.load(Ordering::SeqCst)
        && (config.output.continuous || call < u64::from(config.output.requests))
    {
        let result = engine.bytes(&mut buf);
        if return_code(&result) == 1 {
            succeeded += 1;
        } else {
            failed += 1;
            if let Err(e) = &result {
                warn!("Call {}: random generation failed: {}", call, e);
            }
        }
        call += 1;

        if let Ok(snapshot) = MetricsSnapshot::from_engine(&engine) {
            registry.update(&snapshot);
            #[cfg(feature = "metrics")]
            {
                if let Some(state) = &metrics_state {
                    state.blocking_write().update(&snapshot);
                }
            }
        }
    }

    info!(
        "Processed {} calls: {} succeeded, {} failed",
        call, succeeded, failed
    );
    info!("Status: {}", if engine.status() { "healthy" } else { "quota exceeded" });

    println!(
        "Last output: {}",
        buf.iter().map(|b| format!("{:02x}", b)).collect::<String>()
    );

    match registry.encode() {
        Ok(text) => print!("{}", text),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
}

fn apply_overrides(config: &mut FileConfig, args: &Args) {
    if args.software_only {
        config.output.hardware = false;
    }
    if let Some(size) = args.request_size {
        config.output.request_size = size;
    }
    if let Some(requests) = args.requests {
        config.output.requests = requests;
    }
    if args.continuous {
        config.output.continuous = true;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }
}

fn build_engine(config: &FileConfig, args: &Args) -> Engine {
    let rand_config: &RandConfig = &config.rand;
    let software = ChaChaPrng::from_os_entropy().with_algorithm(rand_config.mix);

    let adapter = if config.output.hardware {
        let mut device = if args.no_device {
            MockSecureElement::absent(args.device_seed)
        } else {
            MockSecureElement::new(args.device_seed)
        };
        if args.fail_fetch {
            device.fail(SessionPhase::Fetch, FailureMode::Once);
        }
        EntropyAdapter::hardware(software, device, config.device.clone(), rand_config)
    } else {
        EntropyAdapter::software_only(software, rand_config)
    };

    let mut engine = RandEngine::new(adapter);
    engine.init();
    info!(
        capability = ?engine.table().capability(),
        max_bytes_per_reseed = rand_config.max_bytes_per_reseed,
        "Random method initialized"
    );
    engine
}

#[cfg(feature = "metrics")]
fn start_metrics_server(
    port: u16,
) -> Option<Arc<tokio::sync::RwLock<se_entropy::metrics::MetricsState>>> {
    use se_entropy::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics server disabled: {}", e);
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });

    Some(state)
}
