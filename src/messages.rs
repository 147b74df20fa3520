use std::fmt;

/// Protocol vocabulary shared by both nodes on the busylight topic.
///
/// Tokens travel as bare ASCII payloads: no framing, no escaping, no
/// length prefix. The Office publishes the Spanish spellings, the Door
/// accepts either spelling for busy/free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// Door asks the Office for attention.
    Ring,
    /// Office lets the caller in.
    Pasa,
    Ocupado,
    Busy,
    Libre,
    Free,
}

impl Token {
    pub const ALL: [Token; 6] = [
        Token::Ring,
        Token::Pasa,
        Token::Ocupado,
        Token::Busy,
        Token::Libre,
        Token::Free,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Token::Ring => "RING",
            Token::Pasa => "PASA",
            Token::Ocupado => "OCUPADO",
            Token::Busy => "BUSY",
            Token::Libre => "LIBRE",
            Token::Free => "FREE",
        }
    }

    /// Exact, case-sensitive match against the vocabulary.
    pub fn from_bytes(payload: &[u8]) -> Option<Token> {
        Token::ALL
            .into_iter()
            .find(|token| token.as_str().as_bytes() == payload)
    }

    pub fn encode(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes an inbound publish. Anything on another topic, or any payload
/// outside the vocabulary, yields `None` and is meant to be dropped.
pub fn decode(topic: &str, payload: &[u8], subscribed_topic: &str) -> Option<Token> {
    if topic != subscribed_topic {
        return None;
    }
    Token::from_bytes(payload)
}
