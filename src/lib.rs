//! atesto: identity credential service.
//!
//! Accounts are created with a password or through a federated identity
//! provider, prove email ownership through single-use verification
//! challenges, and authenticate with short-lived access / long-lived
//! refresh token pairs.

pub mod account;
pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod federation;
