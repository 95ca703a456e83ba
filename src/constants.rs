/// Name used for the virtual device and log messages
pub const DEVICE_NAME: &str = "Mitsubishi HORI/Namco Flightstick 2";

/// Prefix used for config search paths
pub const CONFIG_PREFIX: &str = "hori-flightstick";
