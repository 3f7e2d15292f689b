pub mod matrix;
pub mod homography;

pub use homography::{general_projection, Homography};
