#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `svndiff` implements the binary delta format the representation store
//! persists its delta chains in: a `b"SVN"` magic header followed by a
//! version byte and a sequence of self-describing *windows*. Each window
//! pairs a view into some source text with an instruction stream and a run
//! of literal bytes that together produce a slice of the target text.
//!
//! # Design
//!
//! - [`varint`] holds the MSB-first base-128 integer primitives every other
//!   module builds on.
//! - [`Window`] and [`Instruction`] model one decoded window;
//!   [`read_header`]/[`read_window`] and [`write_header`]/[`write_window`]
//!   are the wire codec.
//! - [`apply`] executes a window's instruction stream against a source
//!   buffer, filling at most the caller's output slice.
//! - [`compose`] folds two windows from adjacent links of a delta chain
//!   into one window standing directly on the deeper link's source.
//! - [`delta_window`] is the generator: a block-match pass (rolling
//!   checksum candidates confirmed by byte comparison) over one
//!   source/target chunk pair.
//!
//! # Invariants
//!
//! - Every window handed out by this crate satisfies [`Window::check`]:
//!   instruction lengths are non-zero and sum to the target view length,
//!   source copies stay inside the source view, target copies only reach
//!   backwards, and literal copies consume the literal run exactly.
//! - `apply(delta_window(s, t, _), s)` reproduces `t` for all inputs.
//! - Composition preserves application:
//!   `apply(compose(a, b), s) == apply(b, apply(a, s))` over the views the
//!   windows describe.

mod apply;
mod compose;
mod error;
mod read;
pub mod varint;
mod window;
mod write;
mod xdelta;

pub use apply::apply;
pub use compose::{compose, Composed};
pub use error::SvndiffError;
pub use read::{read_header, read_window, HEADER_LEN};
pub use window::{Instruction, Window};
pub use write::{write_header, write_window};
pub use xdelta::{delta_window, MATCH_BLOCK_LEN};

/// The only wire format version this codec reads and writes.
pub const FORMAT_VERSION: u8 = 0;
