pub mod agents;
pub mod collaborators;
pub mod draft;
pub mod handlers;
pub mod ledger;
pub mod orchestrator;
pub mod prompts;
pub mod service;
