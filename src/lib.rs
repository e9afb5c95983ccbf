//! Chordcraft Server Library
//!
//! This library exposes the internal modules for testing and for the binary.

pub mod config;
pub mod content_store;
pub mod error;
pub mod generation;
pub mod library;
pub mod llm;
pub mod progression;
pub mod server;
pub mod sqlite_persistence;
