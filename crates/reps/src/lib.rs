#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `reps` is the representation engine of the versioned content store. A
//! *representation* is a stored object that reconstructs to a byte string:
//! either a direct fulltext backed by one string in the store, or a chain
//! of binary diffs against another representation. This crate owns the
//! record model and its persisted codec, serves random-access reads by
//! transparently walking and composing delta chains, layers read and write
//! streams with checksum verification on top, and converts representations
//! between their fulltext and delta forms in place.
//!
//! # Design
//!
//! - [`Representation`], [`RepKind`] and [`DeltaChunk`] model a record;
//!   [`read_rep`], [`write_rep`], [`write_new_rep`], [`get_mutable_rep`]
//!   and [`delete_rep_if_mutable`] are its lifecycle against the store.
//! - [`rep_read_range`] resolves a `(key, offset, length)` request: a
//!   fulltext delegates straight to the backing string, a delta locates
//!   the chunk containing the offset, walks the chain to the terminating
//!   fulltext, folds one window per link into a single composed window
//!   and applies it to the source slice. [`rep_contents`] and
//!   [`rep_contents_size`] are the whole-content conveniences.
//! - [`RepReadStream`] and [`RepWriteStream`] expose chunked access with a
//!   running MD5 that is verified (reads) or sealed into the record
//!   (writes) at end-of-stream.
//! - [`rep_deltify`] converts a representation into a delta against a
//!   source representation, one stored string per window;
//!   [`rep_undeltify`] materialises it back. Both preserve the
//!   reconstructed content and the record checksum.
//!
//! # Invariants
//!
//! - A mutable representation is always a fulltext; a mutable delta is
//!   corruption wherever it is observed.
//! - Delta chunks are ordered, contiguous from offset 0 and never empty;
//!   all chunks of one record diff against the same source, and every
//!   chain reaches a fulltext in finitely many hops.
//! - A sealed record checksum always matches the MD5 of the reconstructed
//!   content; the zero sentinel of a freshly created mutable
//!   representation accepts anything until the first seal.
//! - Deltification and undeltification never change what a representation
//!   reconstructs to.

mod checksum;
mod deltify;
mod error;
mod fold;
mod read;
mod rep;
mod stream;
mod undeltify;

pub use checksum::Checksum;
pub use deltify::{rep_deltify, rep_deltify_with, DeltifyOptions};
pub use error::{Error, Result};
pub use read::{rep_contents, rep_contents_size, rep_read_range};
pub use rep::{
    delete_rep_if_mutable, get_mutable_rep, read_rep, write_new_rep, write_rep, DeltaChunk,
    RepKind, Representation,
};
pub use stream::{RepReadStream, RepWriteStream};
pub use undeltify::rep_undeltify;
