//! Shared support for the workspace's tests.

pub mod logger;
pub mod simulated;

#[cfg(windows)]
pub mod gdi_objects;
