//! docpack - bundle interlinked markdown documents
//!
//! A root document and everything it transitively links to are loaded into a
//! [`registry::Registry`], walked with [`walker::walk`] under depth, navigation
//! and pattern limits, rewritten with the [`rewrite`] engine and written out
//! by [`packager::pack`].
//!
//! ```no_run
//! use std::path::Path;
//! use docpack::packager::{PackOptions, pack};
//!
//! let options = PackOptions {
//!     max_depth: Some(2),
//!     ..PackOptions::default()
//! };
//! let result = pack(Path::new("docs/guide.md"), &options)?;
//! println!("bundled {} files into {}", result.bundled.len(), result.output.display());
//! # Ok::<(), docpack::error::DocpackError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod hash;
pub mod packager;
pub mod path_utils;
pub mod registry;
pub mod resource;
pub mod rewrite;
pub mod ui;
pub mod walker;
