pub use buffer::SampleBuffer;

pub mod buffer;
