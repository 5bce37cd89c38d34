//! 解码后的原始帧 (Frame).

use reel_core::{ChannelLayout, MediaType, NOPTS_VALUE, PixelFormat, Rational, SampleFormat};

/// 视频帧, 每个平面一段像素数据
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数
    pub linesize: Vec<usize>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 显示时间戳
    pub pts: i64,
    pub time_base: Rational,
    /// 时长 (以 time_base 为单位)
    pub duration: i64,
    pub is_keyframe: bool,
}

impl VideoFrame {
    /// 创建平面为空的视频帧
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let planes = pixel_format.plane_count();
        Self {
            data: vec![Vec::new(); planes],
            linesize: (0..planes)
                .map(|p| pixel_format.plane_linesize(p, width).unwrap_or(0))
                .collect(),
            width,
            height,
            pixel_format,
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
            is_keyframe: false,
        }
    }
}

/// 音频帧
///
/// 平面格式每个声道一个 `Vec`, 交错格式只有一个 `Vec`.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub data: Vec<Vec<u8>>,
    /// 每声道采样数
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channel_layout: ChannelLayout,
    /// 显示时间戳
    pub pts: i64,
    pub time_base: Rational,
    /// 时长 (以 time_base 为单位)
    pub duration: i64,
}

impl AudioFrame {
    /// 创建平面为空的音频帧
    pub fn new(
        nb_samples: u32,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        Self {
            data: vec![Vec::new(); sample_format.plane_count(channel_layout.channels)],
            nb_samples,
            sample_rate,
            sample_format,
            channel_layout,
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
        }
    }

    /// 单个平面应有的字节数
    pub fn plane_size(&self) -> usize {
        self.nb_samples as usize * self.sample_format.plane_stride(self.channel_layout.channels)
    }
}

/// 视频帧或音频帧
#[derive(Debug, Clone)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
        }
    }

    pub fn pts(&self) -> i64 {
        match self {
            Self::Video(v) => v.pts,
            Self::Audio(a) => a.pts,
        }
    }

    pub fn set_pts(&mut self, pts: i64) {
        match self {
            Self::Video(v) => v.pts = pts,
            Self::Audio(a) => a.pts = pts,
        }
    }

    pub fn time_base(&self) -> Rational {
        match self {
            Self::Video(v) => v.time_base,
            Self::Audio(a) => a.time_base,
        }
    }

    /// 音频帧的每声道采样数, 视频帧为 0
    pub fn nb_samples(&self) -> u32 {
        match self {
            Self::Video(_) => 0,
            Self::Audio(a) => a.nb_samples,
        }
    }
}
