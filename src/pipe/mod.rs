pub mod codec;

pub use codec::{FrameReader, FrameWriter};
