//! # reel-core
//!
//! reel 转码框架的核心库, 提供基础类型定义、时间基换算和统一错误处理.
//!
//! 其余 crate (编解码、容器、滤镜、转码管线) 都建立在这里的类型之上.

pub mod channel_layout;
pub mod error;
pub mod media_type;
pub mod pixel_format;
pub mod rational;
pub mod sample_format;
pub mod timestamp;

// 重导出常用类型
pub use channel_layout::ChannelLayout;
pub use error::{ReelError, ReelResult};
pub use media_type::MediaType;
pub use pixel_format::PixelFormat;
pub use rational::Rational;
pub use sample_format::SampleFormat;
pub use timestamp::{NOPTS_VALUE, Timestamp, rescale_q};
