pub mod adb;
pub mod connection;
pub mod error;
pub mod probe;
pub mod replay;
pub mod runner;
pub mod snapshot;
