//! Application-layer traffic: constant-rate sources and counting sinks.

mod sink;
mod source;

pub use sink::PacketSink;
pub use source::{ConstantRateSource, TrafficConfig};
