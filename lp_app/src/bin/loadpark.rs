use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use anyhow::anyhow;
use lp_affinity::AffinityController;
use lp_affinity::OsAffinity;
use lp_affinity::SysinfoLocator;
use lp_affinity::topology;
use lp_app::LifecycleCoordinator;
use lp_app::cli;
use lp_app::config_loader;
use lp_app::shutdown_handler;
use lp_app::spawn_monitor;
use lp_app::startup;
use lp_app::tracing_setup;
use lp_log::LogTailer;
use lp_types::Phase;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Keep guard alive for entire application lifetime
    let _guard = tracing_setup::init_with_stdout("loadpark", config_loader::LOG_DIR, tracing::Level::INFO);

    dotenvy::dotenv().ok();

    let config_path = cli::get_config_path(config_loader::DEFAULT_CONFIG_PATH);
    let config = config_loader::load_config_or_default(&config_path);

    let topology = topology::detect(&OsAffinity).context("CPU core detection failed")?;

    let policy = match config_loader::resting_override_from_env(topology.usable_cores()) {
        Some(resting) => {
            info!("Resting allotment overridden by {}: {resting:?}", config_loader::RESTING_CORES_ENV);
            config.policy.with_resting(resting)
        }
        None => config.policy,
    };
    info!(
        "Resting mask {}, loading mask {}, parking {:?} cores",
        policy.mask(Phase::Resting, &topology),
        policy.mask(Phase::Loading, &topology),
        policy.park_side
    );

    let mut locator = SysinfoLocator::new();
    let log_path = startup::resolve_log_file(&mut locator, &config).context("Could not find the game's log file")?;

    // Open before spawning so a missing file fails startup rather than the worker
    let tailer = LogTailer::open(&log_path, config.poll_interval())?;

    let controller = AffinityController::new(locator, OsAffinity, policy, topology, config.process_names.clone());
    let coordinator = LifecycleCoordinator::new(controller);

    let running = Arc::new(AtomicBool::new(true));
    shutdown_handler::setup(Arc::clone(&running))?;

    let monitor = spawn_monitor(coordinator, tailer, Arc::clone(&running))?;
    info!("Monitoring {} (Ctrl+C to exit)", log_path.display());

    // Run until Ctrl+C or the monitor gives up
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    monitor.join().map_err(|_| anyhow!("Log monitor thread panicked"))?.context("Log monitoring ended")?;

    info!("Shutdown complete");
    Ok(())
}
