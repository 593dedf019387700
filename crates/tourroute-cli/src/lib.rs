//! tourroute CLI library.
//!
//! Terminal styling, logging setup and output formatting shared by the
//! `tourroute` binary.

pub mod logging;
pub mod output;
pub mod terminal;
