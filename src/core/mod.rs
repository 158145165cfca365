pub mod color;
pub mod sample;

pub use color::Rgba;
pub use sample::{samples_from_raw, RawPoint, Sample};
