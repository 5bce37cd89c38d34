//! 流描述.

use reel_codec::{AudioCodecParams, CodecId, CodecParameters, CodecParamsType, VideoCodecParams};
use reel_core::{ChannelLayout, MediaType, PixelFormat, Rational, SampleFormat};

/// 容器中的一条基本流
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引, 从 0 开始
    pub index: usize,
    pub media_type: MediaType,
    pub codec_id: CodecId,
    /// 该流数据包时间戳的时间基
    pub time_base: Rational,
    /// 时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 起始时间 (以 time_base 为单位)
    pub start_time: i64,
    /// 编解码器私有数据
    pub extra_data: Vec<u8>,
    pub params: StreamParams,
    /// 元数据 (标题, 语言等)
    pub metadata: Vec<(String, String)>,
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    Video(VideoStreamParams),
    Audio(AudioStreamParams),
    Subtitle,
    Other,
}

#[derive(Debug, Clone)]
pub struct VideoStreamParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 帧率, 未知时为 `Rational::UNDEFINED`
    pub frame_rate: Rational,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
}

#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub sample_format: SampleFormat,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
    /// 每帧采样数, 如 AAC 为 1024; 0 表示可变
    pub frame_size: u32,
}

impl Stream {
    /// 以流描述构造打开解码器所需的参数
    pub fn codec_parameters(&self) -> CodecParameters {
        let (bit_rate, params) = match &self.params {
            StreamParams::Video(v) => (
                v.bit_rate,
                CodecParamsType::Video(VideoCodecParams {
                    width: v.width,
                    height: v.height,
                    pixel_format: v.pixel_format,
                    frame_rate: v.frame_rate,
                }),
            ),
            StreamParams::Audio(a) => (
                a.bit_rate,
                CodecParamsType::Audio(AudioCodecParams {
                    sample_rate: a.sample_rate,
                    channel_layout: a.channel_layout,
                    sample_format: a.sample_format,
                    frame_size: a.frame_size,
                }),
            ),
            StreamParams::Subtitle | StreamParams::Other => (0, CodecParamsType::None),
        };
        CodecParameters {
            codec_id: self.codec_id,
            extra_data: self.extra_data.clone(),
            bit_rate,
            params,
        }
    }

    pub fn audio(&self) -> Option<&AudioStreamParams> {
        match &self.params {
            StreamParams::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn video(&self) -> Option<&VideoStreamParams> {
        match &self.params {
            StreamParams::Video(v) => Some(v),
            _ => None,
        }
    }
}
