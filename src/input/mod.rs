pub mod device;
pub mod manager;
pub mod registry;
pub mod target;
