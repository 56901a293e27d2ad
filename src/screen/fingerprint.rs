use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::snapshot::UiElement;

/// Attribute predicate identifying one UI element.
///
/// Every populated field must equal the corresponding attribute of an
/// element for the fingerprint to match it. Attributes the fingerprint
/// leaves unset are ignored, so extra attributes on the element never
/// prevent a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementFingerprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_desc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl ElementFingerprint {
    pub fn text(text: &str) -> Self {
        ElementFingerprint {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn resource_id(resource_id: &str) -> Self {
        ElementFingerprint {
            resource_id: Some(resource_id.to_string()),
            ..Default::default()
        }
    }

    pub fn content_desc(content_desc: &str) -> Self {
        ElementFingerprint {
            content_desc: Some(content_desc.to_string()),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_content_desc(mut self, content_desc: &str) -> Self {
        self.content_desc = Some(content_desc.to_string());
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// A fingerprint with no populated field constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.content_desc.is_none()
            && self.resource_id.is_none()
            && self.index.is_none()
    }

    /// Exact attribute inclusion against a single element.
    pub fn matches(&self, element: &UiElement) -> bool {
        self.text.as_deref().is_none_or(|t| t == element.text)
            && self
                .content_desc
                .as_deref()
                .is_none_or(|d| d == element.content_desc)
            && self
                .resource_id
                .as_deref()
                .is_none_or(|r| r == element.resource_id)
            && self.index.is_none_or(|i| element.index == Some(i))
    }
}

impl fmt::Display for ElementFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(text) = &self.text {
            parts.push(format!("text={:?}", text));
        }
        if let Some(desc) = &self.content_desc {
            parts.push(format!("content-desc={:?}", desc));
        }
        if let Some(id) = &self.resource_id {
            parts.push(format!("resource-id={:?}", id));
        }
        if let Some(index) = self.index {
            parts.push(format!("index={}", index));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}
