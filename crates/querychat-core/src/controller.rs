//! Transcript controller
//!
//! Owns the transcript, the pending input, the edit slot and every request in
//! flight. User lines are appended synchronously when a turn is submitted; bot
//! lines are appended when the reply for that turn is taken off the reply
//! channel, which means in arrival order rather than submission order. Each
//! message carries its [`TurnId`] so a reply can always be paired with the
//! question it answers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::attachment::check_attachment;
use crate::client::QueryBackend;
use crate::error::{AttachmentError, ControllerError};
use crate::response::TurnOutcome;
use crate::state::{Message, Transcript, TurnId};

/// A finished request, waiting to be appended.
#[derive(Debug)]
struct Reply {
    turn: TurnId,
    outcome: TurnOutcome,
}

/// An edit in progress: which user message, and the text typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSlot {
    pub index: usize,
    pub draft: String,
}

/// Named user actions a front end can raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Submit whatever is in the pending input.
    Submit,
    SubmitText(String),
    BeginEdit(usize),
    SetEditDraft(String),
    CancelEdit,
    CommitEdit,
    AttachFile(String),
}

pub struct TranscriptController {
    backend: Arc<dyn QueryBackend>,
    transcript: Transcript,
    pending_input: String,
    edit_slot: Option<EditSlot>,
    last_turn: u64,
    in_flight: usize,
    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
}

impl TranscriptController {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            transcript: Transcript::new(),
            pending_input: String::new(),
            edit_slot: None,
            last_turn: 0,
            in_flight: 0,
            reply_tx,
            reply_rx,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, text: &str) {
        self.pending_input = text.to_string();
    }

    pub fn edit_slot(&self) -> Option<&EditSlot> {
        self.edit_slot.as_ref()
    }

    /// Number of requests whose reply has not been appended yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<Option<TurnId>, ControllerError> {
        match intent {
            Intent::Submit => Ok(self.submit_pending()),
            Intent::SubmitText(text) => Ok(self.submit(&text)),
            Intent::BeginEdit(index) => self.begin_edit(index).map(|_| None),
            Intent::SetEditDraft(text) => self.set_edit_draft(&text).map(|_| None),
            Intent::CancelEdit => {
                self.cancel_edit();
                Ok(None)
            }
            Intent::CommitEdit => self.commit_edit().map(Some),
            Intent::AttachFile(name) => {
                self.attach_file(&name)?;
                Ok(None)
            }
        }
    }

    /// Start a turn. Whitespace-only text is ignored and returns `None`.
    pub fn submit(&mut self, text: &str) -> Option<TurnId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let turn = self.next_turn();
        self.transcript.push(Message::user(text, turn));
        self.pending_input.clear();
        self.issue(turn, text.to_string());
        Some(turn)
    }

    pub fn submit_pending(&mut self) -> Option<TurnId> {
        let text = self.pending_input.clone();
        self.submit(&text)
    }

    pub fn begin_edit(&mut self, index: usize) -> Result<(), ControllerError> {
        let message = self.user_message(index)?;
        self.edit_slot = Some(EditSlot {
            index,
            draft: message.text.clone(),
        });
        Ok(())
    }

    pub fn set_edit_draft(&mut self, text: &str) -> Result<(), ControllerError> {
        let slot = self.edit_slot.as_mut().ok_or(ControllerError::NoActiveEdit)?;
        slot.draft = text.to_string();
        Ok(())
    }

    pub fn cancel_edit(&mut self) -> Option<EditSlot> {
        self.edit_slot.take()
    }

    pub fn commit_edit(&mut self) -> Result<TurnId, ControllerError> {
        let slot = self.edit_slot.clone().ok_or(ControllerError::NoActiveEdit)?;
        self.edit_message(slot.index, &slot.draft)
    }

    /// Rewrite a user message in place and ask again. The edited message is
    /// the question of the new turn; only its reply gets appended.
    pub fn edit_message(&mut self, index: usize, new_text: &str) -> Result<TurnId, ControllerError> {
        self.user_message(index)?;
        let text = new_text.trim();
        if text.is_empty() {
            return Err(ControllerError::EmptyEdit);
        }

        let turn = self.next_turn();
        self.transcript.replace_text(index, text, turn);
        self.edit_slot = None;
        self.pending_input.clear();
        debug!(index, %turn, "resubmitting edited message");
        self.issue(turn, text.to_string());
        Ok(turn)
    }

    /// Record an upload marker. Nothing is read and no request is made.
    pub fn attach_file(&mut self, name: &str) -> Result<(), AttachmentError> {
        let marker = check_attachment(name)?;
        let turn = self.next_turn();
        self.transcript.push(Message::user(&marker, turn));
        info!(name, "attachment recorded");
        Ok(())
    }

    /// Append a finished reply and return its position.
    fn apply_reply(&mut self, reply: Reply) -> usize {
        self.in_flight = self.in_flight.saturating_sub(1);

        match &reply.outcome {
            TurnOutcome::Answer(_) => info!(turn = %reply.turn, "reply received"),
            TurnOutcome::BadShape(reason) => {
                warn!(turn = %reply.turn, %reason, "rejected response body")
            }
            TurnOutcome::Failed(error) => warn!(turn = %reply.turn, %error, "query failed"),
        }

        self.transcript
            .push(Message::bot(reply.outcome.bot_text(), reply.turn))
    }

    /// Append every reply that has already arrived, without waiting.
    pub fn drain_replies(&mut self) -> usize {
        let mut appended = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.apply_reply(reply);
            appended += 1;
        }
        appended
    }

    /// Wait for the next reply to arrive and append it. Returns `None`
    /// straight away when nothing is in flight.
    pub async fn next_reply(&mut self) -> Option<&Message> {
        if self.in_flight == 0 {
            return None;
        }
        let reply = self.reply_rx.recv().await?;
        let index = self.apply_reply(reply);
        self.transcript.get(index)
    }

    /// Wait until every request in flight has been answered.
    pub async fn settle(&mut self) {
        while self.next_reply().await.is_some() {}
    }

    fn next_turn(&mut self) -> TurnId {
        self.last_turn += 1;
        TurnId(self.last_turn)
    }

    fn user_message(&self, index: usize) -> Result<&Message, ControllerError> {
        let message = self
            .transcript
            .get(index)
            .ok_or(ControllerError::NoSuchMessage(index))?;
        if !message.is_user() {
            return Err(ControllerError::NotAUserMessage(index));
        }
        Ok(message)
    }

    fn issue(&mut self, turn: TurnId, text: String) {
        let backend = Arc::clone(&self.backend);
        let tx = self.reply_tx.clone();
        self.in_flight += 1;
        debug!(%turn, "issuing query");

        tokio::spawn(async move {
            let request = tokio::spawn(async move { backend.query(&text).await });
            let outcome = match request.await {
                Ok(result) => TurnOutcome::from_result(result),
                Err(e) => TurnOutcome::Failed(e.to_string()),
            };
            // The receiver is gone once the controller is dropped.
            let _ = tx.send(Reply { turn, outcome });
        });
    }
}
