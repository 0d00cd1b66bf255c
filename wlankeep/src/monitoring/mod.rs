//! Scheduled monitoring of the connection.

pub(crate) mod poller;
