//! Input handling before a submission reaches the pipeline.
//!
//! - **validate**: count, kind, extension, and size checks (all-or-nothing)
//! - **decode**: image decoding and height clamping
//! - **normalize**: concurrent downscaling and name ordering

pub mod decode;
pub mod normalize;
pub mod validate;

pub use normalize::Normalizer;
pub use validate::Validator;
