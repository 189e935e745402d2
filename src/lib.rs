//! remote-viewer - viewer side of a WebRTC remote screen session
//!
//! This crate lists the capture sources an agent exposes, negotiates a
//! peer connection to one of them over the agent's HTTP signaling API and
//! manages the lifetime of that single session.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod presentation;
pub mod session;
pub mod webrtc;

#[cfg(test)]
mod testing;

pub use error::{AppError, Result};
