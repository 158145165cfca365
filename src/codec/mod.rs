pub mod frame;
pub mod message;

pub use frame::{decode_payload, encode, encode_into, Decoded, FrameCodec, DEFAULT_MAX_FRAME_LEN, HEADER_LEN};
pub use message::{Inbound, Outbound, PlotMessage, TabUpdate, FORWARD_KEYS, PLOT_KEY, UI_KEY};
