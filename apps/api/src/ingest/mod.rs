pub mod extract;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod upload;
