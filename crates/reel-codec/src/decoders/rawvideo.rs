//! 未压缩视频解码器.
//!
//! 一个数据包就是一整帧图像, 按像素格式的平面布局顺序拼接.

use log::debug;
use reel_core::{PixelFormat, ReelError, ReelResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{Frame, VideoFrame};
use crate::packet::Packet;

/// 一帧未压缩图像的平面几何, 编解码两侧共用
#[derive(Debug, Clone, Default)]
pub(crate) struct RawGeometry {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// (每行字节数, 行数), 按平面顺序
    pub planes: Vec<(usize, usize)>,
}

impl RawGeometry {
    pub fn from_params(params: &CodecParameters, role: &str) -> ReelResult<Self> {
        let CodecParamsType::Video(video) = &params.params else {
            return Err(ReelError::InvalidArgument(format!("rawvideo {role}需要视频参数")));
        };
        if video.width == 0 || video.height == 0 || video.pixel_format == PixelFormat::None {
            return Err(ReelError::InvalidArgument(format!(
                "无效的视频参数: {}x{} {}",
                video.width, video.height, video.pixel_format
            )));
        }
        let pf = video.pixel_format;
        let planes = (0..pf.plane_count())
            .map(|p| {
                let linesize = pf.plane_linesize(p, video.width);
                let rows = pf.plane_height(p, video.height);
                linesize.zip(rows).ok_or_else(|| {
                    ReelError::InvalidArgument(format!("无法计算 {pf} 平面 {p} 的尺寸"))
                })
            })
            .collect::<ReelResult<Vec<_>>>()?;
        Ok(Self {
            width: video.width,
            height: video.height,
            pixel_format: pf,
            planes,
        })
    }

    /// 一帧的总字节数
    pub fn frame_bytes(&self) -> usize {
        self.planes.iter().map(|(ls, rows)| ls * rows).sum()
    }
}

/// 未压缩视频解码器
pub struct RawVideoDecoder {
    geometry: RawGeometry,
    pending: Option<Frame>,
    opened: bool,
    draining: bool,
}

impl RawVideoDecoder {
    pub fn create() -> ReelResult<Box<dyn Decoder>> {
        Ok(Box::new(Self {
            geometry: RawGeometry::default(),
            pending: None,
            opened: false,
            draining: false,
        }))
    }
}

impl Decoder for RawVideoDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn name(&self) -> &str {
        "rawvideo"
    }

    fn open(&mut self, params: &CodecParameters) -> ReelResult<()> {
        self.geometry = RawGeometry::from_params(params, "解码器")?;
        self.pending = None;
        self.opened = true;
        self.draining = false;
        debug!(
            "打开 rawvideo 解码器: {}x{} {}, 帧大小 {} 字节",
            self.geometry.width,
            self.geometry.height,
            self.geometry.pixel_format,
            self.geometry.frame_bytes(),
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> ReelResult<()> {
        if !self.opened {
            return Err(ReelError::Codec("解码器未打开".into()));
        }
        if self.pending.is_some() {
            return Err(ReelError::NeedMoreData);
        }
        if packet.is_empty() {
            self.draining = true;
            return Ok(());
        }
        if self.draining {
            return Err(ReelError::InvalidArgument("冲洗之后不能再送入数据包".into()));
        }
        let expected = self.geometry.frame_bytes();
        if packet.size() != expected {
            return Err(ReelError::InvalidData(format!(
                "数据包大小 {} 与帧大小 {} 不符",
                packet.size(),
                expected
            )));
        }

        let g = &self.geometry;
        let mut frame = VideoFrame::new(g.width, g.height, g.pixel_format);
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;
        frame.is_keyframe = true;
        let mut offset = 0;
        for (i, &(linesize, rows)) in g.planes.iter().enumerate() {
            let len = linesize * rows;
            frame.data[i] = packet.data[offset..offset + len].to_vec();
            frame.linesize[i] = linesize;
            offset += len;
        }

        self.pending = Some(Frame::Video(frame));
        Ok(())
    }

    fn receive_frame(&mut self) -> ReelResult<Frame> {
        match self.pending.take() {
            Some(frame) => Ok(frame),
            None if self.draining => Err(ReelError::Eof),
            None => Err(ReelError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.pending = None;
        self.draining = false;
    }
}
