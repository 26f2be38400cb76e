// Automation module protocol
pub mod module;

// Interactive package commands
pub mod packages;
