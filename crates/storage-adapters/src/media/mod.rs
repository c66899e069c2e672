//! Image preparation before upload.

mod resize;

pub use resize::{ImageResizer, ResizeOptions};
