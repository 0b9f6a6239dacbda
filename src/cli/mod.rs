//! Command handlers for the plugctl binary.

pub(crate) mod common;
pub(crate) mod plugin;
