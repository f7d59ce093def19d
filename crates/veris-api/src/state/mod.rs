// Path: crates/veris-api/src/state/mod.rs
//! Core traits for state management.
//!
//! This module defines the primary interface for interacting with the host's
//! transactional key-value state: [`StateAccess`]. Iteration over prefixes is
//! guaranteed to be in byte-lexicographic key order, which the encryption
//! core relies on for deterministic, resumable scans.

use std::sync::Arc;
use veris_types::error::StateError;

// --- Type Aliases for common state patterns ---
/// An atomically reference-counted, owned key slice.
pub type StateKey = Arc<[u8]>;
/// An atomically reference-counted, owned value slice.
pub type StateVal = Arc<[u8]>;
/// An owned key-value pair from the state, using cheap-to-clone Arcs.
pub type StateKVPair = (StateKey, StateVal);
/// A streaming iterator over key-value pairs from the state. It is Send-safe
/// to be moved across async tasks. `Sync` is omitted as iterators are stateful.
pub type StateScanIter<'a> = Box<dyn Iterator<Item = Result<StateKVPair, StateError>> + Send + 'a>;

mod accessor;

pub use accessor::*;
