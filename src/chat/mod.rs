// Terminal rendering of replies
mod display;

// The interactive loop talking to a running server
mod chat;

pub use chat::{ask_server, chat_loop};
pub use display::display_reply;
