//! UI-agnostic transcript types
//!
//! These are shared by every front end and don't depend on any specific UI
//! framework. The transcript is append-only apart from the single edit path,
//! which replaces the text of one user message in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number handed out per accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

/// A single line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Turn that produced this message. A user message and the bot reply to
    /// it carry the same id.
    pub turn: TurnId,
}

impl Message {
    pub fn user(text: &str, turn: TurnId) -> Self {
        Self {
            sender: Sender::User,
            text: text.trim().to_string(),
            turn,
        }
    }

    pub fn bot(text: &str, turn: TurnId) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.trim().to_string(),
            turn,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Ordered list of exchanged messages. Position is the only ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Replace the text of the message at `index`, keeping its position.
    /// Returns false if there is no such message.
    pub fn replace_text(&mut self, index: usize, text: &str, turn: TurnId) -> bool {
        match self.messages.get_mut(index) {
            Some(msg) => {
                msg.text = text.trim().to_string();
                msg.turn = turn;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Bot replies carrying `turn`, in transcript order.
    pub fn replies_to(&self, turn: TurnId) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(move |m| m.sender == Sender::Bot && m.turn == turn)
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_is_trimmed() {
        let msg = Message::user("  hi there \n", TurnId(1));
        assert_eq!(msg.text, "hi there");
        assert!(msg.is_user());
    }

    #[test]
    fn test_replace_text_keeps_position() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("first", TurnId(1)));
        transcript.push(Message::bot("answer", TurnId(1)));
        transcript.push(Message::user("second", TurnId(2)));

        assert!(transcript.replace_text(0, " edited ", TurnId(3)));

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.get(0).unwrap().text, "edited");
        assert_eq!(transcript.get(0).unwrap().turn, TurnId(3));
        assert_eq!(transcript.get(1).unwrap().text, "answer");
    }

    #[test]
    fn test_replace_text_out_of_range() {
        let mut transcript = Transcript::new();
        assert!(!transcript.replace_text(0, "nothing", TurnId(1)));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_replies_to_filters_by_turn() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("a", TurnId(1)));
        transcript.push(Message::user("b", TurnId(2)));
        transcript.push(Message::bot("to b", TurnId(2)));
        transcript.push(Message::bot("to a", TurnId(1)));

        let replies: Vec<&str> = transcript.replies_to(TurnId(1)).map(|m| m.text.as_str()).collect();
        assert_eq!(replies, vec!["to a"]);
    }
}
