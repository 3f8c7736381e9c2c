pub mod attachment;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod response;
pub mod state;

// Re-export main types for convenience
pub use attachment::{is_supported_attachment, ALLOWED_EXTENSIONS};
pub use client::{QueryBackend, QueryClient, DEFAULT_ENDPOINT};
pub use config::Config;
pub use controller::{EditSlot, Intent, TranscriptController};
pub use error::{AttachmentError, ConfigError, ControllerError, QueryError, ShapeError};
pub use response::{validate_response, TurnOutcome, FORMAT_DIAGNOSTIC, UNREACHABLE_DIAGNOSTIC};
pub use state::{Message, Sender, Transcript, TurnId};
