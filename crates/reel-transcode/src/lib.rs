//! # reel-transcode
//!
//! 逐流转码管线: 解码器 -> 滤镜图 -> (重组缓冲) -> 编码器 -> 封装器.
//!
//! 每条参与转码的流拥有一条独立的 [`StreamPipeline`]. 输入结束后管线按
//! 解码器、滤镜图、编码器的顺序逐级冲洗, 上一级完全耗尽之后才冲洗下一级,
//! 冲洗产生的每个数据包都会写出.
//!
//! 音频编码器要求定长帧而解码器帧长不同时, 管线在滤镜图与编码器之间插入
//! [`AudioFifo`], 按编码器帧长切分并以累计采样数生成连续的时间戳;
//! 冲洗时剩余的不足一帧的采样作为最后一帧送出.
//!
//! ```rust,no_run
//! use reel_transcode::{StreamPolicy, run_job};
//!
//! let policy = StreamPolicy {
//!     audio_frame_size: Some(1024),
//!     ..StreamPolicy::default()
//! };
//! let summary = run_job("in.wav", "out.wav", &policy)?;
//! println!("{summary}");
//! # Ok::<(), reel_core::ReelError>(())
//! ```

pub mod adapter;
pub mod fifo;
pub mod pipeline;
pub mod policy;
pub mod transcoder;

pub use adapter::{DecodeAdapter, EncodeAdapter, FilterStage, Pull, Push, Stage, StageAdapter};
pub use fifo::AudioFifo;
pub use pipeline::{PacketSink, PipelineState, PipelineStats, PipelineTiming, StreamPipeline};
pub use policy::StreamPolicy;
pub use transcoder::{
    CopyRoute, JobSummary, MuxerSink, RouteKind, StreamRoute, StreamSummary, Transcoder,
    output_format_for, run_job, run_job_with,
};
