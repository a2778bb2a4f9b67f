#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the two hashing primitives the representation store
//! is built on: a streaming [`Md5`] digest used to checksum reconstructed
//! content, and an Adler-32 style [`RollingChecksum`] used by the delta
//! generator to locate matching blocks between a source and a target byte
//! stream.
//!
//! # Design
//!
//! - [`Md5`] wraps the `md-5` crate behind the small streaming surface the
//!   engine needs (`update`, `finalize`, one-shot `digest`). Content
//!   checksums are always 16 raw bytes; rendering them is the caller's
//!   concern.
//! - [`RollingChecksum`] keeps the classic `s1`/`s2` pair truncated to
//!   16 bits, so a fixed-size window can slide one byte at a time without
//!   rehashing the whole block.
//!
//! # Invariants
//!
//! - Both state components of the rolling checksum are truncated to 16 bits
//!   after every update, so a digest computed incrementally always equals
//!   one computed over the same bytes in a single call.
//! - Rolling a byte out of an empty window is rejected rather than silently
//!   corrupting state.

mod md5;
mod rolling;

pub use md5::Md5;
pub use rolling::{RollingChecksum, RollingError};
