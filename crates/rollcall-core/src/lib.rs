//! Core types for the rollcall badge reader.
//!
//! Time windows, identity records, groups and the attendance coordinator.
//! This crate is deliberately free of database dependencies; persistence is
//! reached through the [`directory::StudentDirectory`] trait.

pub mod attendance;
pub mod directory;
pub mod error;
pub mod group;
pub mod journal;
pub mod student;
pub mod window;

pub use error::{Error, Result};
