use tracing::debug;

use crate::apps::{app_script::AppScript, org_torproject_android::OrbotScript};
use crate::device::connection::version_matches;

/// Every script compiled into the binary.
pub fn builtin_scripts() -> Vec<Box<dyn AppScript>> {
    vec![Box::new(OrbotScript)]
}

/// Look up the built-in script for `package`. When `version` is given the
/// script's version must match it (case and punctuation are ignored).
pub fn find_script(package: &str, version: Option<&str>) -> Option<Box<dyn AppScript>> {
    builtin_scripts().into_iter().find(|script| {
        let meta = script.metadata();
        let found = meta.package_name == package
            && version.is_none_or(|v| version_matches(&meta.version, v));
        debug!(package = %meta.package_name, version = %meta.version, found, "script candidate");
        found
    })
}

/// (package, version) of every built-in script, for listings.
pub fn known_apps() -> Vec<(String, String)> {
    builtin_scripts()
        .iter()
        .map(|s| {
            let meta = s.metadata();
            (meta.package_name, meta.version)
        })
        .collect()
}
