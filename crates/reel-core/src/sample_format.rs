//! 音频采样格式定义.

use std::fmt;

/// 音频采样格式
///
/// - 交错 (Interleaved): 所有声道的采样点交替排列于单个平面, 如 LRLRLR...
/// - 平面 (Planar): 每个声道独立一个平面, 如 LLL... / RRR...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 未指定
    None,
    /// 无符号 8 位, 交错
    U8,
    /// 有符号 16 位, 交错
    S16,
    /// 有符号 32 位, 交错
    S32,
    /// 32 位浮点, 交错
    F32,
    /// 64 位浮点, 交错
    F64,
    /// 无符号 8 位, 平面
    U8p,
    /// 有符号 16 位, 平面
    S16p,
    /// 有符号 32 位, 平面
    S32p,
    /// 32 位浮点, 平面
    F32p,
    /// 64 位浮点, 平面
    F64p,
}

impl SampleFormat {
    /// 单个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 | Self::U8p => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::S32p | Self::F32 | Self::F32p => 4,
            Self::F64 | Self::F64p => 8,
        }
    }

    pub const fn is_planar(&self) -> bool {
        matches!(
            self,
            Self::U8p | Self::S16p | Self::S32p | Self::F32p | Self::F64p
        )
    }

    /// 对应的交错格式 (交错格式返回自身)
    pub const fn to_interleaved(&self) -> Self {
        match self {
            Self::U8p => Self::U8,
            Self::S16p => Self::S16,
            Self::S32p => Self::S32,
            Self::F32p => Self::F32,
            Self::F64p => Self::F64,
            other => *other,
        }
    }

    /// 给定声道数时的平面数量
    pub const fn plane_count(&self, channels: u32) -> usize {
        if self.is_planar() {
            channels as usize
        } else {
            1
        }
    }

    /// 每个平面中一个采样时刻占用的字节数
    ///
    /// 交错格式为 `bytes_per_sample * channels`, 平面格式为 `bytes_per_sample`.
    pub const fn plane_stride(&self, channels: u32) -> usize {
        if self.is_planar() {
            self.bytes_per_sample() as usize
        } else {
            self.bytes_per_sample() as usize * channels as usize
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
            Self::U8p => "u8p",
            Self::S16p => "s16p",
            Self::S32p => "s32p",
            Self::F32p => "fltp",
            Self::F64p => "dblp",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_layout() {
        assert_eq!(SampleFormat::S16.plane_count(2), 1);
        assert_eq!(SampleFormat::S16.plane_stride(2), 4);
        assert_eq!(SampleFormat::F32p.plane_count(6), 6);
        assert_eq!(SampleFormat::F32p.plane_stride(6), 4);
        assert_eq!(SampleFormat::S32p.to_interleaved(), SampleFormat::S32);
    }
}
