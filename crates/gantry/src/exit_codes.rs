//! Exit codes for the CLI

#![allow(dead_code)]

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Signing error
pub const SIGNING_ERROR: i32 = 3;

/// Packaging error
pub const PACKAGING_ERROR: i32 = 4;

/// User cancelled
pub const CANCELLED: i32 = 130;
