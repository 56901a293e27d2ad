//! Drive an installed Android app through a graph of verified screens.
//!
//! A per-app script describes each screen by the UI elements that must be
//! present, and each transition by alternative lists of UI actions. The
//! [`navigation::engine::Navigator`] probes the device, checks which
//! expected screen is showing, executes the chosen action list and
//! re-verifies, until a target screen is reached or the run fails with a
//! diagnostic export of what the device actually showed.

pub mod apps;
pub mod cli;
pub mod device;
pub mod export;
pub mod graph;
pub mod logging;
pub mod navigation;
pub mod report;
pub mod screen;
pub mod trace;
pub mod verification;
