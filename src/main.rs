use anyhow::Context;
use multitouch::logging;
use multitouch::settings::{resolve_settings_path, Settings};
use multitouch::touch::devices;
use multitouch::touch::{
    CancellationToken, Dispatcher, LayeredCompositor, TouchStateMachine, WindowSession,
};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let settings_path = resolve_settings_path(std::env::args_os().nth(1).map(PathBuf::from))?;
    let settings = Settings::load(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::debug!(path = %settings_path.display(), ?settings, "settings loaded");

    let token = CancellationToken::new();
    token
        .cancel_on_termination_signals()
        .context("install termination signal handlers")?;

    match devices::query() {
        Ok(found) => {
            devices::log_devices(&found);
            if settings.print_coordinates {
                if let Err(err) = devices::write_report(&mut std::io::stdout(), &found) {
                    tracing::debug!(?err, "device report write failed");
                }
            }
        }
        Err(err) => tracing::warn!(?err, "input devices could not be listed"),
    }

    let mut session = WindowSession::open(settings.width, settings.height)?;
    let compositor =
        LayeredCompositor::new(settings.width, settings.height, settings.compositor_style())
            .context("allocate render surfaces")?;
    let machine = TouchStateMachine::new(settings.max_touches, settings.marker_geometry());

    let mut dispatcher = Dispatcher::new(machine, compositor, settings.dispatch_config());
    if settings.print_coordinates {
        dispatcher = dispatcher.with_trace(Box::new(std::io::stdout()));
    }

    let (input, output) = session.split();
    let outcome = dispatcher.run(input, output, &token);
    dispatcher.shutdown();

    let stats = dispatcher.stats();
    tracing::info!(
        ?outcome,
        cycles = stats.cycles,
        events = stats.events,
        touches = stats.touches,
        dropped = stats.dropped,
        anomalies = stats.anomalies,
        frames = stats.frames,
        "shutting down"
    );
    // Stdout may end mid-line after the coordinate trace.
    println!();
    Ok(())
}

