//! DSP primitives for feature extraction
//!
//! Pure functions over sample slices and `ndarray` matrices. Nothing here
//! knows about model variants; see [`crate::features`] for that.

pub mod mel;
pub mod mfcc;
pub mod stft;
pub mod window;

pub use mfcc::{mfcc, MfccParams};
pub use window::WindowFunction;
