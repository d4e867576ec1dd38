//! Admin service library
//!
//! Router construction lives here so integration tests can drive the API
//! without binding a socket.

pub mod api;
