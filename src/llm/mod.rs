pub mod client;
pub mod conversation;
pub mod parser;
pub mod prompts;
pub mod retry;
