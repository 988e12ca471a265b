//! The library code for `hndigest`, a toolkit for curated Hacker News
//! digests. A digest lives on disk in one of three formats: an outline
//! document (the editable form, [`crate::parser`] and [`crate::serializer`]),
//! the upstream markdown digest (read-only, [`crate::markdown`]), or record
//! interchange JSON ([`crate::model`]). Everything else operates on the
//! in-memory [`model::Digest`]:
//!
//! 1. [`crate::convert`] moves digests between formats
//! 2. [`crate::build`] renders batches of digests to HTML pages, concatenated
//!    outline, JSON, or a plain-text index ([`crate::htmlrenderer`],
//!    [`crate::llms`])
//! 3. [`crate::validate`] checks digests in their interchange shape
//! 4. [`crate::translate`] reports missing translations and merges incoming
//!    ones without overwriting existing text
//!
//! Output files are always replaced atomically ([`crate::write`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod convert;
pub mod htmlrenderer;
pub mod llms;
pub mod markdown;
pub mod model;
pub mod parser;
pub mod serializer;
pub mod tag;
pub mod translate;
pub mod url;
pub mod util;
pub mod validate;
pub mod value;
pub mod write;
