//! Exit code policy for pgfixtures.
//!
//! - `0` = Success
//! - `10` = General operational failure (a DDL step failed, etc.)
//! - `11` = Connection failure (the probe could not reach the server)
//! - `12` = Configuration error

/// Exit code: success
pub const SUCCESS: i32 = 0;

/// Exit code: general operational failure
pub const OPERATIONAL_FAILURE: i32 = 10;

/// Exit code: connection failure
pub const CONNECTION_FAILURE: i32 = 11;

/// Exit code: configuration error
pub const CONFIG_ERROR: i32 = 12;
