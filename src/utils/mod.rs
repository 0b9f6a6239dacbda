//! Utility modules for plugctl

pub mod retry;
