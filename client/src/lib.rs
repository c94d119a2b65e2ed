//! # dat1-chat
//!
//! Client side of the dat1 chat demo: keeps the conversation state, talks to
//! the proxy in buffered or streaming mode and rebuilds streamed replies from
//! SSE frames as they arrive.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod session;
pub mod ui;

pub use api::ProxyClient;
pub use dispatch::dispatch;
pub use error::{ClientError, InputError};
pub use render::StreamAccumulator;
pub use session::{ChatSession, Dispatch, Mode, SessionEvent};
