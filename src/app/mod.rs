//! Presentation state for a chat front end.
//!
//! Nothing here draws anything. [`AppState`] tracks the logged-in user and
//! display preferences, [`ChatView`] tracks the conversation pane, and
//! [`ChatController`] feeds the pane from the backend.

mod controller;
mod state;
mod view;

pub use controller::ChatController;
pub use state::{AppEvent, AppState, Preferences, Theme};
pub use view::{ChatView, RequestToken, Speaker, TranscriptLine};
