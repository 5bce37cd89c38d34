//! # reel-format
//!
//! 容器格式层: 流描述、`Demuxer`/`Muxer` trait、I/O 上下文、格式探测与注册表.
//!
//! 内置容器只有 WAV. 其他容器通过 [`FormatRegistry`] 注册工厂函数接入.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod io;
pub mod muxer;
pub mod muxers;
pub mod probe;
pub mod registry;
pub mod stream;

pub use demuxer::Demuxer;
pub use format_id::FormatId;
pub use io::{IoBackend, IoContext, MemoryBackend};
pub use muxer::Muxer;
pub use probe::{FormatProbe, ProbeResult};
pub use registry::FormatRegistry;
pub use stream::{AudioStreamParams, Stream, StreamParams, VideoStreamParams};

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
    muxers::register_all_muxers(registry);
}
