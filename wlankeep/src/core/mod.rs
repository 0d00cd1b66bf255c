//! Core logic for keeping the connection.
//!
//! This module contains the utility adapters, the output parsers and the
//! connection state machine with its shared context.

pub(crate) mod command;
pub(crate) mod context;
pub(crate) mod machine;
pub(crate) mod parse;
pub(crate) mod scripted;
