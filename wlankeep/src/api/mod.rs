//! Public API module.
//!
//! This module contains the user-facing keeper and its data types.

pub mod keeper;
pub mod models;
