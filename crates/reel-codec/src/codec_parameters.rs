//! 编解码器参数.

use reel_core::{ChannelLayout, PixelFormat, Rational, SampleFormat};

use crate::codec_id::CodecId;

/// 编解码器参数, 通常从容器中提取, 打开编解码器时传入
#[derive(Debug, Clone)]
pub struct CodecParameters {
    pub codec_id: CodecId,
    /// 额外数据 (如 SPS/PPS)
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s), 0 表示未知
    pub bit_rate: u64,
    /// 媒体类型特定参数
    pub params: CodecParamsType,
}

/// 媒体类型特定参数
#[derive(Debug, Clone)]
pub enum CodecParamsType {
    Video(VideoCodecParams),
    Audio(AudioCodecParams),
    /// 字幕/数据流等无特定参数
    None,
}

/// 视频编解码器参数
#[derive(Debug, Clone)]
pub struct VideoCodecParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 帧率, 未知时为 `Rational::UNDEFINED`
    pub frame_rate: Rational,
}

/// 音频编解码器参数
#[derive(Debug, Clone)]
pub struct AudioCodecParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub sample_format: SampleFormat,
    /// 每帧采样数 (0 表示可变)
    pub frame_size: u32,
}

impl CodecParameters {
    pub fn video(&self) -> Option<&VideoCodecParams> {
        match &self.params {
            CodecParamsType::Video(v) => Some(v),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioCodecParams> {
        match &self.params {
            CodecParamsType::Audio(a) => Some(a),
            _ => None,
        }
    }
}
