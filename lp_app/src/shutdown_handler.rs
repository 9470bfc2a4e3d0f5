use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Sets up a Ctrl+C handler that clears the running flag
///
/// The flag is the only cancellation signal; the log monitor observes it
/// between read attempts.
pub fn setup(running: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Exiting...");
        running.store(false, Ordering::Relaxed);
    })
}
