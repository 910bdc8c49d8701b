//! Built-in sinks

mod base;
pub mod callback;
pub mod console;
pub mod dist;
pub mod dup_filter;
pub mod file;
pub mod network;
pub mod null;
pub mod ringbuffer;
pub mod rotating_file;
pub mod writer;

pub use base::SinkCore;
pub use callback::CallbackSink;
pub use console::{ConsoleSink, ConsoleTarget};
pub use dist::DistSink;
pub use dup_filter::DupFilterSink;
pub use file::{FileSink, FileSinkOptions};
pub use network::{NetworkConfig, NetworkSink, Protocol};
pub use null::NullSink;
pub use ringbuffer::RingBufferSink;
pub use rotating_file::{calc_filename, RotatingFileSink, RotationPolicy, RotationStrategy};
pub use writer::{SharedBuffer, WriterSink};
