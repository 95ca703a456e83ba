use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};

use crate::{
    config::Config,
    drivers::flightstick::driver::{PID, VID},
    usb::{libusb::LibUsbBackend, UsbBackend, UsbDevice},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file to use
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the flightstick daemon (default)
    Run,
    /// List connected flightsticks
    List,
    /// Print the effective configuration
    Config,
}

/// Handle every command except [Commands::Run]
pub fn main_cli(cmd: Commands, config: &Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Commands::Run => (),
        Commands::List => list_devices()?,
        Commands::Config => print!("{}", serde_yaml::to_string(config)?),
    }

    Ok(())
}

/// Print the bus address of every connected flightstick
fn list_devices() -> Result<(), Box<dyn Error + Send + Sync>> {
    let backend = LibUsbBackend::new(VID, PID)?;
    let devices = backend.enumerate()?;
    if devices.is_empty() {
        println!("No flightsticks connected");
        return Ok(());
    }

    for device in devices {
        println!("{}\t{:04x}:{:04x}", device.id(), VID, PID);
    }

    Ok(())
}
