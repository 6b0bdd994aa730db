//! Genie Chat
//!
//! Terminal chat client and backend relay for the Databricks Genie
//! conversational query API. The relay (`serve`) exposes
//! `POST /api/genie/send-message` and forwards each message to a Genie space
//! with credentials from the environment; the client (`chat`) keeps the
//! in-memory conversation session and renders replies, generated SQL, and
//! result tables.

pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod render;
pub mod routes;
