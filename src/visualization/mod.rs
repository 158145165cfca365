pub mod channel_set;
pub mod normalizer;
pub mod ring_buffer;

pub use channel_set::{scaled_capacity, ChannelSet, PlotLine};
pub use normalizer::{SeriesNormalizer, SharedWindow};
pub use ring_buffer::RingBuffer;
