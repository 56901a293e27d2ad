use thiserror::Error;

use crate::screen::screen_model::ScreenId;

/// Malformed script graph, detected while building or validating it.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("script graph has no start screen")]
    NoStartNode,

    #[error("script graph has no end screen")]
    NoEndNode,

    #[error("screen id {0} is used twice")]
    DuplicateScreenId(ScreenId),

    #[error("screen name '{0}' is used twice")]
    DuplicateScreenName(String),

    #[error("screen {0} does not exist in the script graph")]
    UnknownScreen(ScreenId),

    #[error("transition {from} -> {to} points at a screen that does not exist")]
    DanglingTransition { from: ScreenId, to: ScreenId },

    #[error("transition {from} -> {to} carries no action list")]
    EmptyActionLists { from: ScreenId, to: ScreenId },

    #[error("screen {screen} has a fingerprint that constrains no attribute")]
    EmptyFingerprint { screen: ScreenId },

    #[error("screen {screen} selects action list '{name}' but no outgoing transition provides it")]
    UnknownActionList { screen: ScreenId, name: String },

    #[error("no end screen is reachable from start screen {start}")]
    EndUnreachable { start: ScreenId },

    #[error("script file {path}: {message}")]
    ScriptFile { path: String, message: String },
}
