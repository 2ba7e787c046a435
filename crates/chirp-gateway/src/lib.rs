pub mod channel;
pub mod sse;
