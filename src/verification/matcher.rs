use crate::device::snapshot::DeviceSnapshot;
use crate::graph::script_graph::ScriptGraph;
use crate::screen::{
    fingerprint::ElementFingerprint,
    screen_model::{ObservedElements, ScreenDescriptor, ScreenId},
};

// ============================================================================
// Pure screen matching. No retries, no timing, no device access.
// ============================================================================

/// Whether any element of the snapshot satisfies the fingerprint.
pub fn is_present(snapshot: &DeviceSnapshot, fingerprint: &ElementFingerprint) -> bool {
    snapshot.elements.iter().any(|el| fingerprint.matches(el))
}

/// True iff every required fingerprint of `descriptor` matches some element
/// of `snapshot`. A descriptor with no required elements matches any snapshot.
pub fn is_expected_screen(snapshot: &DeviceSnapshot, descriptor: &ScreenDescriptor) -> bool {
    descriptor
        .required_elements
        .iter()
        .all(|fp| is_present(snapshot, fp))
}

/// Required fingerprints that are missing from the snapshot, for diagnostics.
pub fn missing_required<'a>(
    snapshot: &DeviceSnapshot,
    descriptor: &'a ScreenDescriptor,
) -> Vec<&'a ElementFingerprint> {
    descriptor
        .required_elements
        .iter()
        .filter(|fp| !is_present(snapshot, fp))
        .collect()
}

/// Resolve `expected` ids through the graph and return the first screen
/// (in the given order) the snapshot satisfies.
///
/// Ids unknown to the graph are skipped. `None` is a normal outcome, not
/// an error.
pub fn match_any(
    snapshot: &DeviceSnapshot,
    expected: &[ScreenId],
    graph: &ScriptGraph,
) -> Option<ScreenId> {
    expected
        .iter()
        .filter_map(|id| graph.screen(*id))
        .find(|descriptor| is_expected_screen(snapshot, descriptor))
        .map(|descriptor| descriptor.id)
}

/// Split a matched screen's fingerprints into what the snapshot shows.
pub fn observe(snapshot: &DeviceSnapshot, descriptor: &ScreenDescriptor) -> ObservedElements {
    ObservedElements {
        required: descriptor
            .required_elements
            .iter()
            .filter(|fp| is_present(snapshot, fp))
            .cloned()
            .collect(),
        optional: descriptor
            .optional_elements
            .iter()
            .filter(|fp| is_present(snapshot, fp))
            .cloned()
            .collect(),
    }
}
