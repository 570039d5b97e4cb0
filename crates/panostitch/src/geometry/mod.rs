//! Camera and canvas geometry: projections, lens distortion, orientation
//! and the per-image coordinate mapper built from them.

mod distortion;
mod mapper;
mod orientation;
mod projection;

pub use distortion::{InversionConfig, RadialPolynomial};
pub use mapper::{ImageMapper, PanoMapper};
pub use orientation::Orientation;
pub use projection::Projection;
