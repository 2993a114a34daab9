use parley_common::ParleyError;

/// Typing presence errors. None of them are fatal to the caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypingError {
    #[error("conversation id is empty")]
    EmptyConversation,
    #[error("local identity has no user id")]
    Unauthenticated,
    #[error("already joined typing presence for conversation {conversation_id}")]
    AlreadyJoined { conversation_id: String },
    #[error("typing channel {topic} unavailable: {reason}")]
    ChannelUnavailable { topic: String, reason: String },
    #[error("typing broadcast on {topic} failed: {reason}")]
    BroadcastFailed { topic: String, reason: String },
}

impl From<TypingError> for ParleyError {
    fn from(err: TypingError) -> Self {
        ParleyError::Presence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_topic_and_reason() {
        let err = TypingError::ChannelUnavailable {
            topic: "typing-c1".into(),
            reason: "join timed out".into(),
        };
        assert_eq!(err.to_string(), "typing channel typing-c1 unavailable: join timed out");
    }

    #[test]
    fn converts_into_presence_error() {
        let err: ParleyError = TypingError::Unauthenticated.into();
        assert!(matches!(err, ParleyError::Presence(_)));
        assert_eq!(err.to_string(), "presence error: local identity has no user id");
    }
}
