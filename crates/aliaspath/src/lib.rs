//! # fsbrowse alias paths
//!
//! This crate provides the path abstraction shared by the fsbrowse engine:
//! a path is either a concrete OS path or an alias-rooted path of the wire
//! form `%NAME%` / `%NAME%/relative/segments`.
//!
//! The crate is pure: no I/O, no knowledge of which aliases are currently
//! registered. Resolving an alias against the live location registry is the
//! job of the `navigator` crate.
//!
//! ## Wire form
//!
//! - `%ProjectDir%`: an alias with an empty remainder.
//! - `%ProjectDir%/data/logs`: an alias plus a `/`-separated remainder.
//! - Anything else: a concrete OS path, passed through unchanged.
//!
//! Parsing is total: every string maps to exactly one [`AliasPath`], and
//! `parse(format(x)) == x` holds for every value produced by this crate.

pub mod error;
pub mod path;

pub use error::AliasPathError;
pub use path::{combine, AliasPath};
