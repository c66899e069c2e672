//! # Domain Models
//!
//! The ad record is the only persisted entity. Everything else here describes
//! how an ad is drafted (generation inputs/outputs) or handed between flows.

pub mod ad;
pub mod draft;
pub mod generation;
pub mod image;

pub use ad::*;
pub use draft::*;
pub use generation::*;
pub use image::*;
