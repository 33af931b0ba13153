//! Topic model (C1): builds and parses canonical topic strings.
//!
//! For a device namespace `(prefix, deviceId)` there are four canonical
//! topics: `{prefix}/{deviceId}/{kind}`. This module is pure, holds no
//! state, and exposes no wildcards — subscribers always deal in exact
//! topic strings.

use std::fmt;

pub use crate::protocol_constants::DEFAULT_TOPIC_PREFIX;

/// The four message kinds routed through a device's topic namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TopicKind {
    State,
    Commands,
    Responses,
    Connection,
}

impl TopicKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Commands => "commands",
            Self::Responses => "responses",
            Self::Connection => "connection",
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "state" => Some(Self::State),
            "commands" => Some(Self::Commands),
            "responses" => Some(Self::Responses),
            "connection" => Some(Self::Connection),
            _ => None,
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A device's topic namespace: `(prefix, deviceId)`.
///
/// `prefix` may itself contain `/` segments (the default is
/// `"amora/devices"`), so parsing splits from the right: the last segment
/// is the kind, the second-to-last is the device id, and everything
/// before that is the prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceTopics {
    pub prefix: String,
    pub device_id: String,
}

impl DeviceTopics {
    pub fn new(prefix: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            device_id: device_id.into(),
        }
    }

    /// Builds the canonical topic string for `kind` in this namespace.
    #[must_use]
    pub fn build(&self, kind: TopicKind) -> String {
        format!("{}/{}/{}", self.prefix, self.device_id, kind)
    }

    /// Parses a concrete topic string into `(DeviceTopics, TopicKind)`.
    ///
    /// Returns `None` if the topic does not have at least three `/`
    /// separated segments or if the final segment isn't a known kind.
    #[must_use]
    pub fn parse(topic: &str) -> Option<(Self, TopicKind)> {
        let last_slash = topic.rfind('/')?;
        let (rest, kind_segment) = topic.split_at(last_slash);
        let kind_segment = &kind_segment[1..]; // drop the '/'
        let kind = TopicKind::parse(kind_segment)?;

        let prefix_slash = rest.rfind('/')?;
        let (prefix, device_segment) = rest.split_at(prefix_slash);
        let device_id = &device_segment[1..];

        if prefix.is_empty() || device_id.is_empty() {
            return None;
        }

        Some((Self::new(prefix, device_id), kind))
    }
}
