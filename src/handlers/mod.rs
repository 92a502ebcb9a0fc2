pub mod commands;
pub mod documents;
pub mod messages;
pub mod rules;

pub use commands::command_handler;
pub use documents::document_handler;
pub use messages::message_handler;
