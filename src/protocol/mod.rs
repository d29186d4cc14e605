//! Wire protocol: packet codec and stream reassembly.

pub mod frame_buffer;
pub mod packet;

pub use frame_buffer::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
pub use packet::Packet;
