//! Manga reader page pipeline: page lifecycle, spread merge/split, and the
//! zoom/pan contract.
//!
//! The crate sits between a byte provider and a viewport. A host implements
//! [`source::PageSource`] (network, archive or downloaded chapter — the
//! pipeline does not care which), builds a [`pipeline::PagePipeline`] from it,
//! and attaches the pages it wants on screen. Each attached page loads off
//! the host thread and reports status, gated progress and finally a decoded
//! payload through [`pipeline::PageState::pump`]. Adjacent pages attached as
//! a pair go through the spread flow: once both byte buffers are in,
//! [`spread`] decides merge/split/abort and [`compose`] does the pixel work.
//! [`zoom::ZoomController`] handles the framing once an image is on screen.

pub mod compose;
pub mod config;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod sniff;
pub mod source;
pub mod spread;
pub mod zoom;
