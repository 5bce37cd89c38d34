//! # reel
//!
//! 纯 Rust 实现的逐流转码管线.
//!
//! 每条输入流经过 解码 -> 滤镜 -> (音频重组) -> 编码 -> 封装, 输入结束后按
//! 解码器、滤镜图、编码器的顺序逐级冲洗, 不丢失任何缓冲中的数据.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use reel::transcode::{StreamPolicy, run_job};
//!
//! let policy = StreamPolicy {
//!     audio_encoder: Some("pcm_f32le".into()),
//!     audio_frame_size: Some(1024),
//!     ..StreamPolicy::default()
//! };
//! let summary = run_job("in.wav", "out.wav", &policy)?;
//! println!("{summary}");
//! # Ok::<(), reel::core::ReelError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `reel-core` | 核心类型, 时间基换算, 错误类型 |
//! | `reel-codec` | 编解码器框架与 PCM/rawvideo 编解码器 |
//! | `reel-format` | 容器格式框架与 WAV |
//! | `reel-filter` | 滤镜图与格式归一化滤镜 |
//! | `reel-transcode` | 转码管线, 音频重组缓冲, 任务编排 |

/// 核心类型与工具
pub use reel_core as core;

/// 编解码器框架
pub use reel_codec as codec;

/// 容器格式框架
pub use reel_format as format;

/// 滤镜框架
pub use reel_filter as filter;

/// 转码管线与任务编排
pub use reel_transcode as transcode;

/// 获取 reel 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编解码器的注册表
pub fn default_codec_registry() -> reel_codec::CodecRegistry {
    let mut registry = reel_codec::CodecRegistry::new();
    reel_codec::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> reel_format::FormatRegistry {
    let mut registry = reel_format::FormatRegistry::new();
    reel_format::register_all(&mut registry);
    registry
}
