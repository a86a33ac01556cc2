//! Terminal front end: the chat loop, single-shot `ask`, and tool listings.

pub mod chat;
pub mod tools;

pub use chat::{ask, chat_loop, describe_event};
pub use tools::{write_catalog, write_server_report};
