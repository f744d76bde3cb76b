pub mod escape;
pub mod extractor;
pub mod frame;

pub use extractor::{Extraction, FrameExtractor};
pub use frame::{DeserializeError, Frame, SerializeError};
