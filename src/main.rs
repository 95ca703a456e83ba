use std::env;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use crate::cli::{main_cli, Args, Commands};
use crate::config::Config;
use crate::drivers::flightstick::driver::{PID, VID};
use crate::input::manager::Manager;
use crate::input::target::flightstick::UinputFactory;
use crate::usb::libusb::LibUsbBackend;
use crate::usb::UsbBackend;

mod cli;
mod config;
mod constants;
mod drivers;
mod input;
mod usb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let config = Config::load(args.config.as_deref())?;

    // Handle any CLI arguments
    match args.cmd {
        None | Some(Commands::Run) => (),
        Some(cmd) => return main_cli(cmd, &config),
    }

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting hori-flightstick v{}", VERSION);

    let backend = LibUsbBackend::new(VID, PID)?;
    let waker = backend.waker();
    let shutdown = Arc::new(AtomicBool::new(false));

    // Setup CTRL+C handler
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signal: {e}");
            return;
        }
        log::info!("Shutting down");
        flag.store(true, Ordering::SeqCst);
        waker();
    });

    // The polling loop blocks on USB transfers
    let mut manager = Manager::new(backend, UinputFactory, config);
    let task = tokio::task::spawn_blocking(move || {
        let result = manager.start();
        if result.is_ok() {
            manager.run(&shutdown);
        }
        manager.shutdown();
        result
    });

    match task.await? {
        Ok(_) => log::info!("The flightstick manager has exited"),
        Err(e) => {
            log::error!("Error starting the flightstick manager: {e}");
            return Err(e.into());
        }
    }

    log::info!("hori-flightstick stopped");

    Ok(())
}
