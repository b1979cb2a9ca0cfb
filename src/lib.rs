//! Chat presence and message-relay service.
//!
//! Participants register, keep themselves alive with heartbeats, post public or
//! private messages and poll for what they are allowed to see. A background
//! [`Janitor`](presence::Janitor) evicts participants whose heartbeats stopped and
//! announces their departure.

pub mod api;
pub mod common;
pub mod config;
pub mod messages;
pub mod presence;
pub mod service;
pub mod storage;

pub use common::{ChatError, Message, MessageKind, Participant, Result};
pub use service::ChatService;
