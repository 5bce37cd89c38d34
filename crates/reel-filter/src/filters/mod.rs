//! 内置滤镜实现.
//!
//! - **null**: 原样透传, 不需要归一化的流使用
//! - **aformat**: 采样格式与声道数转换
//! - **format**: 视频像素格式与尺寸校验
//! - **volume**: 音量调节

pub mod aformat;
pub mod format;
pub mod null;
pub mod volume;
