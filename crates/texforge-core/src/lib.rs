//! texforge Core Library
//!
//! This crate provides the data model shared by the texforge crates: image
//! sources and formats, texture settings, and the serializable description of
//! every exported texture.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;
