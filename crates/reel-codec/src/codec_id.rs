//! 编解码器标识符.

use std::fmt;

use reel_core::MediaType;

/// 编解码器标识符, 与容器格式无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知
    None,

    // 视频
    /// 未压缩视频
    RawVideo,
    /// H.264 / AVC
    H264,
    /// MPEG-2 Video
    Mpeg2Video,

    // 音频
    /// PCM 无符号 8 位
    PcmU8,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// PCM 有符号 16 位大端
    PcmS16be,
    /// PCM 有符号 24 位小端
    PcmS24le,
    /// PCM 有符号 32 位小端
    PcmS32le,
    /// PCM 32 位浮点小端
    PcmF32le,
    /// AAC
    Aac,
    /// Opus
    Opus,
    /// MPEG Audio Layer II
    Mp2,

    // 字幕
    /// SubRip
    Srt,
}

const ALL: &[CodecId] = &[
    CodecId::RawVideo,
    CodecId::H264,
    CodecId::Mpeg2Video,
    CodecId::PcmU8,
    CodecId::PcmS16le,
    CodecId::PcmS16be,
    CodecId::PcmS24le,
    CodecId::PcmS32le,
    CodecId::PcmF32le,
    CodecId::Aac,
    CodecId::Opus,
    CodecId::Mp2,
    CodecId::Srt,
];

impl CodecId {
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::None => MediaType::Data,
            Self::RawVideo | Self::H264 | Self::Mpeg2Video => MediaType::Video,
            Self::PcmU8
            | Self::PcmS16le
            | Self::PcmS16be
            | Self::PcmS24le
            | Self::PcmS32le
            | Self::PcmF32le
            | Self::Aac
            | Self::Opus
            | Self::Mp2 => MediaType::Audio,
            Self::Srt => MediaType::Subtitle,
        }
    }

    /// 短名称, 与命令行中的编解码器名一致
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RawVideo => "rawvideo",
            Self::H264 => "h264",
            Self::Mpeg2Video => "mpeg2video",
            Self::PcmU8 => "pcm_u8",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS16be => "pcm_s16be",
            Self::PcmS24le => "pcm_s24le",
            Self::PcmS32le => "pcm_s32le",
            Self::PcmF32le => "pcm_f32le",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Mp2 => "mp2",
            Self::Srt => "srt",
        }
    }

    /// 按短名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_id_名称与媒体类型() {
        for id in ALL {
            assert_eq!(CodecId::from_name(id.name()), Some(*id));
        }
        assert_eq!(CodecId::from_name("vp9"), None);
        assert_eq!(CodecId::Srt.media_type(), MediaType::Subtitle);
        assert_eq!(CodecId::Opus.media_type(), MediaType::Audio);
    }
}
