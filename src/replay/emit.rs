use crate::core::ReplayMessage;
use crate::replay::ReplayListener;
use tracing::{error, warn};

/// Structurally validate a sentence and build its outbound envelope.
///
/// A sentence must be at least 6 bytes and start with `$` or `!`; the 5
/// characters after the marker become the message id. Failures are logged and
/// swallowed so one bad record never stalls playback.
pub(crate) fn build_message(sentence: &str) -> Option<ReplayMessage> {
    if sentence.len() < 6 {
        warn!("sentence too short, skipping: {:?}", sentence);
        return None;
    }

    if !sentence.starts_with(['$', '!']) {
        warn!("invalid sentence start, skipping: {:?}", sentence);
        return None;
    }

    // Bytes 1..6 can fall off a UTF-8 boundary on malformed input; treat that
    // as an envelope construction failure, not a loop error.
    let Some(msg_id) = sentence.get(1..6) else {
        error!("cannot extract message id from sentence: {:?}", sentence);
        return None;
    };

    Some(ReplayMessage::new(msg_id, sentence))
}

/// Deliver one sentence to the listener, soft-failing on invalid input.
pub(crate) async fn deliver(sentence: &str, listener: &dyn ReplayListener) {
    if let Some(msg) = build_message(sentence) {
        listener.notify(msg).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SOURCE_ID;

    #[test]
    fn test_valid_sentences() {
        let msg = build_message("$GPGGA,123519,4807.038,N").unwrap();
        assert_eq!(msg.msg_id, "GPGGA");
        assert_eq!(msg.sentence, "$GPGGA,123519,4807.038,N");
        assert_eq!(msg.source, SOURCE_ID);

        let msg = build_message("!AIVDM,1,1,,B,AAA,0*00").unwrap();
        assert_eq!(msg.msg_id, "AIVDM");
    }

    #[test]
    fn test_too_short() {
        assert!(build_message("").is_none());
        assert!(build_message("$GPGG").is_none());
    }

    #[test]
    fn test_exactly_six_bytes() {
        let msg = build_message("$GPGGA").unwrap();
        assert_eq!(msg.msg_id, "GPGGA");
    }

    #[test]
    fn test_wrong_start_marker() {
        assert!(build_message("GPGGA,123519,4807.038").is_none());
        assert!(build_message("@GPGGA,123519").is_none());
    }

    #[test]
    fn test_multibyte_id_boundary() {
        // 'é' straddles byte 6, so the id slice is not a char boundary.
        assert!(build_message("$GPGGé,123519").is_none());
    }
}
