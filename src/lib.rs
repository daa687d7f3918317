pub mod accounts;
pub mod auth;
pub mod billing;
pub mod chat;
pub mod completion;
pub mod config;
pub mod decode;
pub mod entitlements;
pub mod error;
pub mod extractor;
pub mod prompts;
pub mod routes;
pub mod voice;
