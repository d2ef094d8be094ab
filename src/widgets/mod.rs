//! Server side of the marketing widgets (booking modal, chat bubble).

pub mod booking;
pub mod chat;
