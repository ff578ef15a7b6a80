//! Core - event loop, events, state and session settings

pub mod app;
pub mod events;
pub mod session;
pub mod state;
