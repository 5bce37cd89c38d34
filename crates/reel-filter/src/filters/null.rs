//! 透传滤镜, 对应 FFmpeg 的 `null`/`anull`.

use reel_codec::frame::Frame;
use reel_core::ReelResult;

use crate::{Filter, FrameSlot};

/// 透传滤镜, 音视频帧均原样输出
#[derive(Debug, Default)]
pub struct NullFilter {
    slot: FrameSlot,
}

impl NullFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for NullFilter {
    fn name(&self) -> &str {
        "null"
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        match frame {
            Some(frame) => self.slot.put(frame.clone()),
            None => {
                self.slot.start_draining();
                Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use reel_codec::frame::VideoFrame;
    use reel_core::{PixelFormat, ReelError};

    #[test]
    fn test_null_passthrough_video() {
        let mut filter = NullFilter::new();
        let mut vf = VideoFrame::new(4, 2, PixelFormat::Gray8);
        vf.data[0] = vec![7; 8];
        vf.pts = 42;
        filter.send_frame(Some(&Frame::Video(vf))).unwrap();
        let Frame::Video(out) = filter.receive_frame().unwrap() else {
            panic!("期望视频帧");
        };
        assert_eq!(out.pts, 42);
        assert_eq!(out.data[0], vec![7; 8]);
        assert!(matches!(filter.receive_frame(), Err(ReelError::NeedMoreData)));
    }

    #[test]
    fn test_null_eof_after_flush() {
        let mut filter = NullFilter::new();
        filter.send_frame(None).unwrap();
        assert!(matches!(filter.receive_frame(), Err(ReelError::Eof)));
        filter.flush();
        assert!(matches!(filter.receive_frame(), Err(ReelError::NeedMoreData)));
    }
}
