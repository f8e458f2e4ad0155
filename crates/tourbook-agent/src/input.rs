//! Newline-delimited JSON input.
//!
//! Each non-blank line is either an interaction event
//! (`{"event_name": "tour_view", "entity_type": "tour", "entity_id": "42", "immediate": true}`)
//! or a lifecycle change (`{"lifecycle": "hidden"}`).

use serde::Deserialize;
use tourbook_analytics::LifecycleSignal;
use tourbook_core::event::EventDraft;

/// Lifecycle transitions accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    /// See [`LifecycleSignal::Hidden`].
    Hidden,
    /// See [`LifecycleSignal::Visible`].
    Visible,
    /// See [`LifecycleSignal::Unload`].
    Unload,
}

impl From<LifecycleCommand> for LifecycleSignal {
    fn from(command: LifecycleCommand) -> Self {
        match command {
            LifecycleCommand::Hidden => Self::Hidden,
            LifecycleCommand::Visible => Self::Visible,
            LifecycleCommand::Unload => Self::Unload,
        }
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    /// A lifecycle change.
    Lifecycle {
        /// The transition.
        lifecycle: LifecycleCommand,
    },
    /// An interaction to track.
    Event {
        /// Event fields.
        #[serde(flatten)]
        draft: EventDraft,
        /// Whether to flush right away.
        #[serde(default)]
        immediate: bool,
    },
}

impl InputLine {
    /// Parses one line. Returns `Ok(None)` for blank lines.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the line is not a JSON object of either form.
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::{InputLine, LifecycleCommand};

    #[test]
    fn test_parse_event_line() {
        let line = r#"{"event_name":"tour_view","entity_type":"tour","entity_id":"42","metadata":{"source":"search"}}"#;

        let parsed = InputLine::parse(line).unwrap().unwrap();

        match parsed {
            InputLine::Event { draft, immediate } => {
                assert_eq!(draft.event_name, "tour_view");
                assert_eq!(draft.entity_id.as_deref(), Some("42"));
                assert_eq!(draft.metadata["source"], "search");
                assert!(!immediate);
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_immediate_flag() {
        let parsed = InputLine::parse(r#"{"event_name":"booking_confirmed","immediate":true}"#)
            .unwrap()
            .unwrap();

        assert!(matches!(parsed, InputLine::Event { immediate: true, .. }));
    }

    #[test]
    fn test_parse_lifecycle_line() {
        let parsed = InputLine::parse(r#"{"lifecycle":"hidden"}"#).unwrap().unwrap();
        assert_eq!(
            parsed,
            InputLine::Lifecycle {
                lifecycle: LifecycleCommand::Hidden
            }
        );
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(InputLine::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(InputLine::parse("{not json").is_err());
        assert!(InputLine::parse("42").is_err());
    }
}
