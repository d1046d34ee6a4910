use signal_hook::{
    consts::{SIGINT, SIGQUIT, SIGTERM},
    iterator::Signals,
};
use tokio_util::sync::CancellationToken;

/// What should we do when the user stops this program?
///
/// The first signal cancels `token`; the watcher stops, the aggregator
/// flushes what it holds and the process exits cleanly.
pub fn handle_shutdown(token: CancellationToken) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGQUIT])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::info!("Received signal {signal}, shutting down");
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            token.cancel();
        }
    });

    Ok(())
}
