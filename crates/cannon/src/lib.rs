//! cannon command-line front end
//!
//! Parses arguments, loads the gateway configuration and drives a
//! `cannon_gateway::Gateway` with the host executor and a local store.

#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

pub mod cli;
pub mod commands;
pub mod logging;
