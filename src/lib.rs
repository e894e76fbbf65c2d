//! Interactive chat shell for a local completion server.
//!
//! The binary is a thin loop over these modules: [`commands`] parses slash
//! commands, [`app`] owns the session and applies them, [`runtime`] streams
//! one turn through a [`runtime::CompletionBackend`], and [`render`] turns
//! results into terminal text.

pub mod app;
pub mod commands;
pub mod config;
pub mod input;
pub mod interrupt;
pub mod logging;
pub mod modes;
pub mod render;
pub mod runtime;
