//! Path matching and resolution engine.
//!
//! This module is the operational core of the crate. The public surface in
//! `api.rs` and the `Template` methods are thin wrappers over what lives
//! here.
//!
//! ## How the parts work together
//!
//! At a high level, every operation is a pipeline over immutable, pre-built
//! configuration:
//!
//! ```text
//! definition ──┐
//!              │  compile_key_set            (compiled.rs, at registry load)
//!              └───────────────┬──────────────
//!                              │
//! path ── fields_from_path ────┼─ try key-sets most-specific first
//!         (matcher.rs)         │  parse tokens through key formats
//!                              v
//!                       Fields / NoMatch
//!
//! fields ── paths_from_template (search.rs)
//!             - wildcard skip keys + absent required keys
//!             - render one glob per feasible key-set, dedup
//!             - glob the file system, re-validate every hit
//!                              │
//!                              v
//!           abstract_paths_from_template (collapse.rs)
//!             - search one level up when the leaf collapses
//!             - fold abstract key values into symbolic tokens
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiled.rs`: turns a key-set's literal+key structure into an anchored
//!   regex with one capture slot per key occurrence.
//! - `matcher.rs`: reverse parsing — tries each key-set's pattern against a
//!   path and recovers typed field values.
//! - `search.rs`: forward search — builds glob strings from partial field
//!   sets and filters raw file-system matches down to real template matches.
//! - `collapse.rs`: folds families of concrete paths (frame sequences,
//!   stereo eyes) into one symbolic representative per family.
//!
//! Everything here is synchronous and stateless across calls; the only I/O
//! is the file-system glob inside `search.rs`, reached through the
//! [`FileSystem`](crate::FileSystem) collaborator.

#[path = "engine/collapse.rs"]
mod collapse;
#[path = "engine/compiled.rs"]
mod compiled;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/search.rs"]
mod search;


pub(crate) use collapse::abstract_paths_from_template;
pub(crate) use compiled::{CompiledKeySet, compile_key_set};
pub(crate) use matcher::fields_from_path;
pub(crate) use search::paths_from_template;
