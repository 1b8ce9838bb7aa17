//! Brewer Panel Daemon
//!
//! Drives the brewer's ILI9341 display: initializes the panel, then renders
//! the brew status, progress bar and sensitivity bars until the brew ends.

mod backend;
mod brew;
mod config;
mod rendering;
mod state;
mod widgets;

use anyhow::{Context, Result};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::Delay;
use std::time::{Duration, Instant};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use brew::BrewStage;
use config::{Config, PanelBackend};
use rendering::Font;
use state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    let font = Font::from_path(&config.font.path, config.font.size);

    // Opening or initializing the panel is fatal
    match config.panel.backend {
        PanelBackend::Spidev => {
            let display = backend::open_spidev(&config.panel).context("Failed to open panel")?;
            run(AppState::new(config, display, &mut Delay, font)?).await
        }
        PanelBackend::Simulated => {
            let (display, panel) = backend::simulated(&config.panel)?;
            run(AppState::new(config, display, &mut panel.delay(), font)?).await
        }
    }
}

/// Renders frames until the brew finishes or a signal arrives.
async fn run<SPI, DC, RST>(mut state: AppState<SPI, DC, RST>) -> Result<()>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(state.refresh_interval_ms().max(1)));
    let mut consecutive_errors: u32 = 0;
    let mut last_error_log = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let since_start_ms = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);
                match state.render_frame(since_start_ms) {
                    Ok(report) => {
                        consecutive_errors = 0;
                        if report.snapshot.stage == BrewStage::Finished {
                            info!("Brew finished after {} ms", since_start_ms);
                            break;
                        }
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        // Only log errors once per minute or on first error
                        let elapsed = last_error_log.elapsed();
                        if consecutive_errors == 1 || elapsed >= Duration::from_secs(60) {
                            if consecutive_errors > 1 {
                                warn!(
                                    "Render error (repeated {} times in {:?}): {:#}",
                                    consecutive_errors, elapsed, e
                                );
                            } else {
                                warn!("Render error: {:#}", e);
                            }
                            last_error_log = Instant::now();
                            consecutive_errors = 0;
                        }
                    }
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    Ok(())
}
