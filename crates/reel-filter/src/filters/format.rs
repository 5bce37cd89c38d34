//! 视频格式校验滤镜.
//!
//! 对标 FFmpeg 的 `format`, 但不做像素格式转换或缩放:
//! 几何尺寸与像素格式已符合编码器要求的帧原样通过, 其余帧以 `Unsupported` 拒绝.

use reel_codec::frame::{Frame, VideoFrame};
use reel_core::{PixelFormat, ReelError, ReelResult};

use crate::{Filter, FrameSlot};

/// 视频格式校验滤镜
#[derive(Debug)]
pub struct FormatFilter {
    pixel_format: PixelFormat,
    /// 0 表示不检查
    width: u32,
    height: u32,
    slot: FrameSlot,
}

impl FormatFilter {
    pub fn new(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            width: 0,
            height: 0,
            slot: FrameSlot::default(),
        }
    }

    /// 同时要求帧尺寸
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn check(&self, frame: &VideoFrame) -> ReelResult<()> {
        if frame.pixel_format != self.pixel_format {
            return Err(ReelError::Unsupported(format!(
                "format 滤镜不做像素格式转换: {} -> {}",
                frame.pixel_format, self.pixel_format
            )));
        }
        let size_mismatch = (self.width != 0 && frame.width != self.width)
            || (self.height != 0 && frame.height != self.height);
        if size_mismatch {
            return Err(ReelError::Unsupported(format!(
                "format 滤镜不做缩放: {}x{} -> {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Filter for FormatFilter {
    fn name(&self) -> &str {
        "format"
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        match frame {
            None => {
                self.slot.start_draining();
                Ok(())
            }
            Some(Frame::Video(vf)) => {
                if self.slot.is_full() {
                    return Err(ReelError::NeedMoreData);
                }
                self.check(vf)?;
                self.slot.put(Frame::Video(vf.clone()))
            }
            Some(Frame::Audio(_)) => {
                Err(ReelError::InvalidArgument("format 滤镜仅支持视频帧".into()))
            }
        }
    }

    fn receive_frame(&mut self) -> ReelResult<Frame> {
        self.slot.take()
    }

    fn flush(&mut self) {
        self.slot.reset();
    }
}
