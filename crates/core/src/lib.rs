//! Core library for testgen
//!
//! This crate is the **Functional Core** of testgen. Everything here is a pure
//! transformation: it builds prompts, picks apart model output, shapes GitHub
//! responses and decides which GitHub call comes next, but never touches the
//! network or the filesystem. The `testgen` binary crate is the Imperative
//! Shell that performs the I/O and feeds the results back in.
//!
//! # Module Organization
//!
//! - [`summary`]: summary prompt, JSON array extraction from free-form model
//!   text, schema validation and `file` normalization
//! - [`codegen`]: code-generation prompt and Markdown fence stripping
//! - [`llm`]: request/response envelopes for each inference provider
//! - [`github`]: GitHub API shapes, repository slugs and the pull-request
//!   contribution state machine
//! - [`text`]: small string helpers
//!
//! # Example Usage
//!
//! ```rust
//! use testgen_core::summary::{extract_json_array, validate_summaries, ValidationMode};
//!
//! let raw = "Here you go:\n[{\"title\":\"t\",\"description\":\"d\",\"file\":[\"a.ts\",\"b.ts\"]}]";
//! let records = extract_json_array(raw).unwrap();
//! let summaries = validate_summaries(records, ValidationMode::Lenient).unwrap();
//!
//! assert_eq!(summaries[0].file.as_deref(), Some("a.ts, b.ts"));
//! ```

pub mod codegen;
pub mod github;
pub mod llm;
pub mod summary;
pub mod text;
