//! Type definitions and constants.
//!
//! This module contains the utility's command-line vocabulary and the fixed
//! texts the keeper publishes.

pub(crate) mod constants;
