#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `store` is the backing layer the representation engine runs against: a
//! `strings` table holding raw byte strings, a `reps` table holding encoded
//! representation records, and the [`Trail`] object that scopes one attempt
//! of a transactional operation over both.
//!
//! # Design
//!
//! - Tables are keyed by the opaque [`StringKey`] and [`RepKey`] newtypes;
//!   records reference each other by key only, never by in-memory pointer.
//! - A [`Trail`] buffers every mutation it performs. [`Trail::commit`]
//!   publishes the whole attempt atomically; dropping an uncommitted trail
//!   aborts it, restoring the tables byte for byte.
//! - Within one trail, reads observe that trail's earlier writes. Across
//!   trails, [`MemoryStore`] serialises attempts by holding its lock for
//!   the trail's lifetime; a contended backend would instead surface
//!   transient conflicts for [`run_trail`] to replay.
//! - The trail also polices stream usage: a representation with an open
//!   read stream cannot acquire the write lock in the same trail and vice
//!   versa, turning interleaved stream access into a refusal instead of a
//!   silent misread.

mod error;
mod keys;
mod memory;
mod retry;

pub use error::{Retryable, StoreError};
pub use keys::{RepKey, StringKey, TxnId};
pub use memory::{MemoryStore, Trail};
pub use retry::run_trail;
