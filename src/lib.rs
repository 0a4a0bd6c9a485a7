//! Download trading card images and stamp a point-value badge on each one.

pub mod driver;
pub mod error;
pub mod overlay;
pub mod records;
pub mod source;
pub mod typeface;
