//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and rigid + scale transforms
//! - Logging setup

pub mod math;
pub mod logging;
