use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::device::error::ProbeError;

// ============================================================================
// UI element model (one `<node>` of a uiautomator hierarchy dump)
// ============================================================================

/// Screen rectangle as reported by uiautomator: `[left,top][right,bottom]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Parse the `bounds` attribute, e.g. `[0,63][1080,210]`.
    pub fn parse(raw: &str) -> Option<Bounds> {
        let numbers: Vec<i32> = raw
            .split(|c: char| c == '[' || c == ']' || c == ',')
            .filter(|part| !part.is_empty())
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .ok()?;

        match numbers.as_slice() {
            [left, top, right, bottom] => Some(Bounds {
                left: *left,
                top: *top,
                right: *right,
                bottom: *bottom,
            }),
            _ => None,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// A single element of the captured UI hierarchy.
///
/// uiautomator always emits the string attributes, so absent values are
/// represented as empty strings rather than `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiElement {
    pub index: Option<u32>,
    pub text: String,
    pub resource_id: String,
    pub class_name: String,
    pub package: String,
    pub content_desc: String,
    pub clickable: bool,
    pub enabled: bool,
    pub bounds: Option<Bounds>,
}

impl UiElement {
    /// Element carrying only a visible text.
    pub fn with_text(text: &str) -> Self {
        UiElement {
            text: text.to_string(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Element carrying only a resource id.
    pub fn with_resource_id(resource_id: &str) -> Self {
        UiElement {
            resource_id: resource_id.to_string(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn content_desc(mut self, content_desc: &str) -> Self {
        self.content_desc = content_desc.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attr = |name: &str| node.attribute(name).unwrap_or("").to_string();
        UiElement {
            index: node.attribute("index").and_then(|v| v.parse().ok()),
            text: attr("text"),
            resource_id: attr("resource-id"),
            class_name: attr("class"),
            package: attr("package"),
            content_desc: attr("content-desc"),
            clickable: node.attribute("clickable") == Some("true"),
            enabled: node.attribute("enabled") != Some("false"),
            bounds: node.attribute("bounds").and_then(Bounds::parse),
        }
    }
}

// ============================================================================
// Device snapshot
// ============================================================================

/// Point-in-time capture of the device UI hierarchy.
///
/// Elements are flattened in document order. A snapshot is never reused
/// across verification decisions: the UI can change between probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub captured_at_ms: u128,
    pub elements: Vec<UiElement>,

    /// Raw hierarchy dump, when the snapshot came from a device or file.
    #[serde(skip)]
    pub raw_xml: Option<String>,
}

impl DeviceSnapshot {
    /// Build a snapshot from already-parsed elements.
    pub fn from_elements(elements: Vec<UiElement>) -> Self {
        DeviceSnapshot {
            captured_at_ms: now_ms(),
            elements,
            raw_xml: None,
        }
    }

    /// Parse a uiautomator hierarchy dump.
    ///
    /// Text printed around the XML document (adb status lines such as
    /// `UI hierchary dumped to: /dev/tty`) is ignored.
    pub fn from_xml(raw: &str) -> Result<Self, ProbeError> {
        let xml = extract_document(raw)
            .ok_or_else(|| ProbeError::SnapshotParse("no XML hierarchy in dump output".into()))?;

        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| ProbeError::SnapshotParse(e.to_string()))?;

        if !doc.root_element().has_tag_name("hierarchy") {
            return Err(ProbeError::SnapshotParse(format!(
                "unexpected root element <{}>",
                doc.root_element().tag_name().name()
            )));
        }

        let elements = doc
            .descendants()
            .filter(|n| n.has_tag_name("node"))
            .map(UiElement::from_node)
            .collect();

        Ok(DeviceSnapshot {
            captured_at_ms: now_ms(),
            elements,
            raw_xml: Some(xml.to_string()),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Visible texts, in document order, skipping empty ones.
    pub fn texts(&self) -> Vec<&str> {
        self.elements
            .iter()
            .map(|e| e.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// Content digest used to name and correlate diagnostic exports.
    pub fn digest(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        match &self.raw_xml {
            Some(xml) => hasher.update(xml.as_bytes()),
            None => {
                for el in &self.elements {
                    hasher.update(el.resource_id.as_bytes());
                    hasher.update([0u8]);
                    hasher.update(el.text.as_bytes());
                    hasher.update([0u8]);
                    hasher.update(el.content_desc.as_bytes());
                    hasher.update([1u8]);
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn extract_document(raw: &str) -> Option<&str> {
    let start = raw.find('<')?;
    let end = raw.rfind('>')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

pub(crate) fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0"><node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="org.torproject.android" content-desc="" clickable="false" enabled="true" bounds="[0,0][1080,2220]"><node index="1" text="Orbot" resource-id="org.torproject.android:id/title" class="android.widget.TextView" package="org.torproject.android" content-desc="" clickable="false" enabled="true" bounds="[42,84][300,160]" /><node index="2" text="START" resource-id="org.torproject.android:id/btnStart" class="android.widget.Button" package="org.torproject.android" content-desc="" clickable="true" enabled="true" bounds="[340,1500][740,1700]" /></node></hierarchy>
UI hierchary dumped to: /dev/tty"#;

    #[test]
    fn parses_nodes_in_document_order() {
        let snapshot = DeviceSnapshot::from_xml(DUMP).expect("dump should parse");
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.texts(), vec!["Orbot", "START"]);

        let start = &snapshot.elements[2];
        assert_eq!(start.resource_id, "org.torproject.android:id/btnStart");
        assert_eq!(start.index, Some(2));
        assert!(start.clickable);
        assert_eq!(start.bounds.map(|b| b.center()), Some((540, 1600)));
    }

    #[test]
    fn rejects_output_without_hierarchy() {
        let err = DeviceSnapshot::from_xml("ERROR: null root node returned by UiTestAutomationBridge.")
            .expect_err("no xml present");
        assert!(matches!(err, ProbeError::SnapshotParse(_)));
    }

    #[test]
    fn bounds_parse_rejects_garbage() {
        assert_eq!(Bounds::parse("[1,2][3]"), None);
        assert_eq!(Bounds::parse("nonsense"), None);
        assert!(Bounds::parse("[5,5][5,9]").expect("valid").is_empty());
    }

    #[test]
    fn digest_is_stable_for_equal_content() {
        let a = DeviceSnapshot::from_elements(vec![UiElement::with_text("Orbot")]);
        let b = DeviceSnapshot::from_elements(vec![UiElement::with_text("Orbot")]);
        let c = DeviceSnapshot::from_elements(vec![UiElement::with_text("STOP")]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }
}
