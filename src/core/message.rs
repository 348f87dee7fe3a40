use serde::{Deserialize, Serialize};

/// Source identifier carried by every message emitted from a replayed file
pub const SOURCE_ID: &str = "FileReplay";

/// One loaded log record: the raw sentence plus its recovered time offset
///
/// `timestamp_offset` is seconds relative to the first successfully parsed
/// line of the file; the first loaded record always has offset 0. Records are
/// immutable once loaded and are kept in file order, never sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLine {
    /// Raw sentence text, e.g. `$GPGGA,...` or `!AIVDM,...`
    pub sentence: String,

    /// Seconds relative to the first parsed line
    pub timestamp_offset: f64,
}

impl DataLine {
    pub fn new(sentence: impl Into<String>, timestamp_offset: f64) -> Self {
        Self {
            sentence: sentence.into(),
            timestamp_offset,
        }
    }
}

/// Outbound message envelope delivered to the registered listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayMessage {
    /// Message identifier: the 5 characters following the `$`/`!` marker
    pub msg_id: String,

    /// The full raw sentence, marker included
    pub sentence: String,

    /// Originating source, always [`SOURCE_ID`] for file replay
    pub source: String,
}

impl ReplayMessage {
    pub fn new(msg_id: impl Into<String>, sentence: impl Into<String>) -> Self {
        Self {
            msg_id: msg_id.into(),
            sentence: sentence.into(),
            source: SOURCE_ID.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_message_source() {
        let msg = ReplayMessage::new("GPGGA", "$GPGGA,123519,4807.038,N");
        assert_eq!(msg.msg_id, "GPGGA");
        assert_eq!(msg.source, "FileReplay");
    }
}
