//! Analytics event model.
//!
//! UI code builds an [`EventDraft`]; the queue normalizes it into an
//! [`AnalyticsEvent`] whose timestamp and identity fields are always set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AnalyticsError;

/// An interaction as reported by the caller, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Interaction type, e.g. `tour_view`.
    #[serde(default)]
    pub event_name: String,
    /// Kind of entity the interaction concerns, e.g. `tour`.
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Identifier of that entity.
    #[serde(default)]
    pub entity_id: Option<String>,
    /// When the interaction happened; defaults to enqueue time.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Caller-supplied device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Caller-supplied session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Free-form event attributes.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Free-form environment attributes (page, locale, ...).
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl EventDraft {
    /// Starts a draft for the named interaction.
    #[must_use]
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Self::default()
        }
    }

    /// Sets the subject of the event.
    #[must_use]
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets an explicit occurrence time.
    #[must_use]
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Sets a caller-chosen device identifier.
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets a caller-chosen session identifier.
    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds one context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Normalizes the draft into a deliverable event.
    ///
    /// Fields the caller left unset (or blank, for identifiers) are filled
    /// from `defaults`; fields the caller did set are kept as-is.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Validation` if the event name is empty after
    /// trimming.
    pub fn normalize(self, defaults: &EventDefaults<'_>) -> Result<AnalyticsEvent, AnalyticsError> {
        let event_name = self.event_name.trim();
        if event_name.is_empty() {
            return Err(AnalyticsError::Validation(
                "event_name must not be empty".to_owned(),
            ));
        }

        Ok(AnalyticsEvent {
            event_name: event_name.to_owned(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            occurred_at: self.occurred_at.unwrap_or(defaults.now),
            device_id: non_blank(self.device_id).unwrap_or_else(|| defaults.device_id.to_owned()),
            session_id: non_blank(self.session_id)
                .unwrap_or_else(|| defaults.session_id.to_owned()),
            metadata: self.metadata,
            context: self.context,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Values applied to a draft at enqueue time.
#[derive(Debug, Clone, Copy)]
pub struct EventDefaults<'a> {
    /// Enqueue time.
    pub now: DateTime<Utc>,
    /// The process's resolved device identifier.
    pub device_id: &'a str,
    /// The process's session identifier.
    pub session_id: &'a str,
}

/// A normalized analytics event, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Trimmed, non-empty interaction type.
    pub event_name: String,
    /// Kind of entity the interaction concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Identifier of that entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// When the interaction happened.
    pub occurred_at: DateTime<Utc>,
    /// Device the event came from.
    pub device_id: String,
    /// Application load the event belongs to.
    pub session_id: String,
    /// Free-form event attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Free-form environment attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}
