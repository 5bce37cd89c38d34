//! 像素格式定义.

use std::fmt;

/// 像素格式
///
/// 命名规则: 颜色空间 + 采样比 + 排列方式 (p = 平面).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    #[default]
    None,
    /// YUV 4:2:0 平面, 8 位
    Yuv420p,
    /// YUV 4:2:2 平面, 8 位
    Yuv422p,
    /// YUV 4:4:4 平面, 8 位
    Yuv444p,
    /// Y 平面 + UV 交错平面, 4:2:0
    Nv12,
    /// RGB 打包, 每分量 8 位
    Rgb24,
    /// RGBA 打包, 每分量 8 位
    Rgba,
    /// 灰度 8 位
    Gray8,
}

impl PixelFormat {
    /// 色度子采样的对数 (水平, 垂直), 如 4:2:0 为 (1, 1)
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Nv12 => (1, 1),
            Self::Yuv422p => (1, 0),
            _ => (0, 0),
        }
    }

    pub const fn plane_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 => 2,
            Self::Rgb24 | Self::Rgba | Self::Gray8 => 1,
        }
    }

    /// 指定平面一行的字节数, 平面不存在时返回 `None`
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        let w = width as usize;
        let (sx, _) = self.chroma_subsampling();
        let chroma_w = (w + (1 << sx) - 1) >> sx;
        Some(match (self, plane) {
            (Self::Rgb24, _) => w * 3,
            (Self::Rgba, _) => w * 4,
            (Self::Nv12, 1) => chroma_w * 2,
            (_, 0) => w,
            _ => chroma_w,
        })
    }

    /// 指定平面的行数, 平面不存在时返回 `None`
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        let h = height as usize;
        if plane == 0 {
            return Some(h);
        }
        let (_, sy) = self.chroma_subsampling();
        Some((h + (1 << sy) - 1) >> sy)
    }

    /// 一帧图像 (所有平面) 的总字节数
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if *self == Self::None {
            return None;
        }
        (0..self.plane_count())
            .map(|p| Some(self.plane_linesize(p, width)? * self.plane_height(p, height)?))
            .sum()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
            Self::Gray8 => "gray",
        };
        write!(f, "{name}")
    }
}
