pub mod actions;
pub mod fingerprint;
pub mod screen_model;
