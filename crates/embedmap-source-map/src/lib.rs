/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source positions for embedmap.
 */

//! Source positions for embedmap
//!
//! This crate provides the coordinate vocabulary shared by the rest of the
//! workspace: byte offsets, 0-indexed rows and UTF-16 columns, and a line
//! index for fast conversion between them.
//!
//! # Overview
//!
//! The core types are:
//! - [`Location`]: A single position (offset, row, column)
//! - [`Range`]: A half-open span between two locations
//! - [`FileInformation`]: Line-break index over a text
//!
//! # Example
//!
//! ```rust
//! use embedmap_source_map::*;
//!
//! let text = "let a = 1\nlet b = 2";
//! let info = FileInformation::new(text);
//!
//! let loc = info.offset_to_location(14, text).unwrap();
//! assert_eq!(loc.row, 1);
//! assert_eq!(loc.column, 4);
//! assert_eq!(info.line_text(1, text), Some("let b = 2"));
//! ```

pub mod file_info;
pub mod types;
pub mod utils;

// Re-export main types
pub use file_info::FileInformation;
pub use types::{Location, Range};
pub use utils::byte_to_utf16_column;
