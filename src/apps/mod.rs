pub mod app_script;
pub mod org_torproject_android;
pub mod registry;
