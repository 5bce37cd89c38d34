//! 未压缩视频编码器, 把各平面逐行拼成一个数据包.

use bytes::Bytes;
use log::debug;
use reel_core::{PixelFormat, ReelError, ReelResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::decoders::rawvideo::RawGeometry;
use crate::encoder::Encoder;
use crate::frame::Frame;
use crate::packet::Packet;

pub struct RawVideoEncoder {
    geometry: RawGeometry,
    pending: Option<Packet>,
    opened: bool,
    draining: bool,
}

impl RawVideoEncoder {
    pub fn create() -> ReelResult<Box<dyn Encoder>> {
        Ok(Box::new(Self {
            geometry: RawGeometry::default(),
            pending: None,
            opened: false,
            draining: false,
        }))
    }
}

impl Encoder for RawVideoEncoder {
    fn codec_id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn name(&self) -> &str {
        "rawvideo"
    }

    fn open(&mut self, params: &CodecParameters) -> ReelResult<()> {
        self.geometry = RawGeometry::from_params(params, "编码器")?;
        self.pending = None;
        self.opened = true;
        self.draining = false;
        debug!(
            "打开 rawvideo 编码器: {}x{} {}",
            self.geometry.width, self.geometry.height, self.geometry.pixel_format,
        );
        Ok(())
    }

    fn preferred_pixel_format(&self) -> Option<PixelFormat> {
        self.opened.then_some(self.geometry.pixel_format)
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        if !self.opened {
            return Err(ReelError::Codec("编码器未打开".into()));
        }
        if self.pending.is_some() {
            return Err(ReelError::NeedMoreData);
        }
        let Some(frame) = frame else {
            self.draining = true;
            return Ok(());
        };
        if self.draining {
            return Err(ReelError::InvalidArgument("冲洗之后不能再送入帧".into()));
        }
        let Frame::Video(vf) = frame else {
            return Err(ReelError::InvalidArgument("rawvideo 编码器只接受视频帧".into()));
        };
        let g = &self.geometry;
        if vf.width != g.width || vf.height != g.height || vf.pixel_format != g.pixel_format {
            return Err(ReelError::InvalidArgument(format!(
                "帧 {}x{} {} 与编码器 {}x{} {} 不符",
                vf.width, vf.height, vf.pixel_format, g.width, g.height, g.pixel_format
            )));
        }

        let mut out = Vec::with_capacity(g.frame_bytes());
        for (i, &(linesize, rows)) in g.planes.iter().enumerate() {
            let plane = vf.data.get(i).map(Vec::as_slice).unwrap_or_default();
            // 帧的行跨度可能大于有效宽度
            let stride = vf.linesize.get(i).copied().unwrap_or(linesize).max(linesize);
            if plane.len() < stride * (rows - 1) + linesize {
                return Err(ReelError::InvalidData(format!("平面 {i} 数据不足")));
            }
            for row in 0..rows {
                out.extend_from_slice(&plane[row * stride..row * stride + linesize]);
            }
        }

        let mut pkt = Packet::from_data(Bytes::from(out));
        pkt.pts = vf.pts;
        pkt.dts = vf.pts;
        pkt.duration = vf.duration;
        pkt.time_base = vf.time_base;
        pkt.is_keyframe = true;
        self.pending = Some(pkt);
        Ok(())
    }

    fn receive_packet(&mut self) -> ReelResult<Packet> {
        match self.pending.take() {
            Some(pkt) => Ok(pkt),
            None if self.draining => Err(ReelError::Eof),
            None => Err(ReelError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.pending = None;
        self.draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec_parameters::{CodecParamsType, VideoCodecParams};
    use crate::frame::VideoFrame;
    use reel_core::Rational;

    fn open_encoder(pf: PixelFormat) -> Box<dyn Encoder> {
        let mut enc = RawVideoEncoder::create().unwrap();
        enc.open(&CodecParameters {
            codec_id: CodecId::RawVideo,
            extra_data: Vec::new(),
            bit_rate: 0,
            params: CodecParamsType::Video(VideoCodecParams {
                width: 2,
                height: 2,
                pixel_format: pf,
                frame_rate: Rational::new(25, 1),
            }),
        })
        .unwrap();
        enc
    }

    #[test]
    fn test_rawvideo_去除行填充() {
        let mut enc = open_encoder(PixelFormat::Gray8);
        assert_eq!(enc.preferred_pixel_format(), Some(PixelFormat::Gray8));
        let mut vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        // 行跨度 4, 有效宽度 2
        vf.data[0] = vec![1, 2, 0, 0, 3, 4, 0, 0];
        vf.linesize[0] = 4;
        vf.pts = 5;
        enc.send_frame(Some(&Frame::Video(vf))).unwrap();
        let pkt = enc.receive_packet().unwrap();
        assert_eq!(pkt.data.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(pkt.pts, 5);
    }

    #[test]
    fn test_pixel_format_mismatch() {
        let mut enc = open_encoder(PixelFormat::Rgb24);
        let vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        let err = enc.send_frame(Some(&Frame::Video(vf))).unwrap_err();
        assert!(matches!(err, ReelError::InvalidArgument(_)));
    }

    #[test]
    fn test_eof_after_flush() {
        let mut enc = open_encoder(PixelFormat::Rgb24);
        enc.send_frame(None).unwrap();
        assert!(matches!(enc.receive_packet(), Err(ReelError::Eof)));
    }
}
