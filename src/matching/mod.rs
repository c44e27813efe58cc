//! Matching and conflict resolution.
//!
//! Subtitle text is normalized and ranked by edit distance; frame-difference
//! reports are parsed and clustered into intervals. Both end up as claims in a
//! [`ClaimSet`](crate::domain::claims::ClaimSet) that [`resolve::resolve`] turns
//! into decisions.

pub mod aggregate;
pub mod clustering;
pub mod distance;
pub mod frames;
pub mod normalize;
pub mod resolve;
