//! cipherpost - message-driven encryption engine.
//!
//! Converts payloads to and from password-protected containers through a
//! uniform request/response API:
//! - AES Crypt v3 streams (`legacy`)
//! - raw AES-256-GCM containers with PBKDF2 keys (`aead`)
//! - age passphrase files (`thirdParty`)
//!
//! Callers post [`message::Request`] envelopes to a [`worker::Worker`] (or
//! call a [`router::Router`] directly) and get a [`message::Response`] back
//! for every one, failures included.

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod router;
pub mod secret;
pub mod types;
pub mod validate;
pub mod worker;
