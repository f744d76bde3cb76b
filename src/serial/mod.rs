pub mod traits;
pub mod tx;

pub use traits::{ByteSink, SharedRingSink};
pub use tx::send_frame;
