pub mod encode;
pub mod replay;
pub mod request;

pub use encode::{EncodeOptions, encode, request_for};
pub use replay::{MAX_REPLAY_BASE, ParagraphView, ReplayError, SimulatedDocument, TextStyleState};
pub use request::{BatchUpdate, Request};
