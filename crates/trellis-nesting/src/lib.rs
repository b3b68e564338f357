//! Trellis Nesting
//!
//! This crate materializes the transitive composition structure of workflows
//! as a closure table: one [`Nesting`] row per (reachable transformation,
//! reaching path class) inside a workflow's operator graph. The closure
//! trades write-time recomputation for read-time simplicity: `descendants`
//! and `ancestors` become plain lookups instead of recursive traversals.
//!
//! [`build_nestings`] is the recomputation pass. It is a pure function over a
//! workflow's content plus a prefetched map of all workflow contents, so the
//! store can run it inside the same transaction as the entity write and
//! atomically replace the workflow's previous rows.

mod closure;
mod error;
mod nesting;

pub use closure::build_nestings;
pub use error::NestingError;
pub use nesting::{Descendant, Nesting};
