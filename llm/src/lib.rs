pub mod client;
pub mod router;
pub mod stream;

pub use client::{CallError, CallResponse, UpstreamClient, Usage};
pub use router::{call_free_pool, call_premium, prefers_provider_a, FreePoolError};
pub use stream::{error_events, proxy as proxy_stream, StreamStats};
