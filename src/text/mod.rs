//! Text front-end: normalisation and sentence segmentation.
//!
//! Both steps are pure, total functions.
//!
//! ```text
//! raw text ──normalize──▶ normalised text ──segment──▶ [Sentence; n]
//! ```

pub mod normalize;
pub mod segment;

pub use normalize::normalize;
pub use segment::{segment, Sentence};
