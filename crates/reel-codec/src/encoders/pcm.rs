//! PCM 音频编码器.
//!
//! 默认接受任意采样数的帧. 以 `frame_size > 0` 打开时要求定长帧,
//! 只有最后一帧可以更短.

use bytes::Bytes;
use log::debug;
use reel_core::{ChannelLayout, Rational, ReelError, ReelResult, SampleFormat, rescale_q};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoders::pcm::{PcmVariant, pcm_variant};
use crate::encoder::{CodecCapabilities, Encoder};
use crate::frame::Frame;
use crate::packet::Packet;

/// PCM 音频编码器
pub struct PcmEncoder {
    variant: PcmVariant,
    sample_rate: u32,
    channel_layout: ChannelLayout,
    /// 0 表示可变帧长
    frame_size: u32,
    /// 定长模式下已收到过短帧, 之后不能再有帧
    short_frame_seen: bool,
    pending: Option<Packet>,
    opened: bool,
    draining: bool,
}

impl PcmEncoder {
    fn create(codec_id: CodecId) -> ReelResult<Box<dyn Encoder>> {
        let variant = pcm_variant(codec_id)
            .ok_or_else(|| ReelError::CodecNotFound(format!("{codec_id} 不是 PCM 格式")))?;
        Ok(Box::new(Self {
            variant,
            sample_rate: 0,
            channel_layout: ChannelLayout::MONO,
            frame_size: 0,
            short_frame_seen: false,
            pending: None,
            opened: false,
            draining: false,
        }))
    }

    pub fn new_u8() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmU8)
    }

    pub fn new_s16le() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS16le)
    }

    pub fn new_s16be() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS16be)
    }

    pub fn new_s24le() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS24le)
    }

    pub fn new_s32le() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS32le)
    }

    pub fn new_f32le() -> ReelResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmF32le)
    }

    fn check_frame_size(&mut self, nb_samples: u32) -> ReelResult<()> {
        if self.frame_size == 0 {
            return Ok(());
        }
        if self.short_frame_seen {
            return Err(ReelError::InvalidArgument(format!(
                "{}: 短帧之后不能再送入帧",
                self.name()
            )));
        }
        if nb_samples > self.frame_size {
            return Err(ReelError::InvalidArgument(format!(
                "{}: 帧包含 {} 个采样, 超过帧长 {}",
                self.name(),
                nb_samples,
                self.frame_size
            )));
        }
        if nb_samples < self.frame_size {
            self.short_frame_seen = true;
        }
        Ok(())
    }
}

impl Encoder for PcmEncoder {
    fn codec_id(&self) -> CodecId {
        self.variant.codec_id
    }

    fn name(&self) -> &str {
        self.variant.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> ReelResult<()> {
        let CodecParamsType::Audio(audio) = &params.params else {
            return Err(ReelError::InvalidArgument(format!(
                "{} 编码器需要音频参数",
                self.name()
            )));
        };
        if audio.sample_rate == 0 || audio.channel_layout.channels == 0 {
            return Err(ReelError::InvalidArgument(format!(
                "无效的音频参数: {} Hz, {} 声道",
                audio.sample_rate, audio.channel_layout.channels
            )));
        }

        self.sample_rate = audio.sample_rate;
        self.channel_layout = audio.channel_layout;
        self.frame_size = audio.frame_size;
        self.short_frame_seen = false;
        self.pending = None;
        self.opened = true;
        self.draining = false;

        debug!(
            "打开 {} 编码器: {} Hz, {}, 输入 {}, 帧长 {}",
            self.name(),
            self.sample_rate,
            self.channel_layout,
            self.variant.sample_format,
            if self.frame_size == 0 {
                "可变".to_string()
            } else {
                self.frame_size.to_string()
            },
        );
        Ok(())
    }

    fn capabilities(&self) -> CodecCapabilities {
        if self.frame_size == 0 {
            CodecCapabilities::VARIABLE_FRAME_SIZE
        } else {
            CodecCapabilities::empty()
        }
    }

    fn frame_size(&self) -> u32 {
        self.frame_size
    }

    fn preferred_sample_format(&self) -> Option<SampleFormat> {
        Some(self.variant.sample_format)
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
        let Frame::Audio(af) = frame else {
            return Err(ReelError::InvalidArgument(format!(
                "{} 编码器只接受音频帧",
                self.name()
            )));
        };
        if af.sample_format != self.variant.sample_format
            || af.channel_layout.channels != self.channel_layout.channels
        {
            return Err(ReelError::InvalidArgument(format!(
                "{} 编码器期望 {} / {} 声道, 收到 {} / {} 声道",
                self.name(),
                self.variant.sample_format,
                self.channel_layout.channels,
                af.sample_format,
                af.channel_layout.channels
            )));
        }
        self.check_frame_size(af.nb_samples)?;

        let samples = af.data.first().map(Vec::as_slice).unwrap_or_default();
        if samples.len() < af.plane_size() {
            return Err(ReelError::InvalidData(format!(
                "音频帧数据不足: 需要 {} 字节, 实际 {}",
                af.plane_size(),
                samples.len()
            )));
        }
        let samples = &samples[..af.plane_size()];
        let wire_len = af.nb_samples as usize
            * (self.variant.wire_bytes * self.channel_layout.channels) as usize;
        let mut out = Vec::with_capacity(wire_len);
        (self.variant.pack)(samples, &mut out);

        let sample_tb = Rational::new(1, self.sample_rate as i32);
        let (time_base, duration) = if af.time_base.is_valid() {
            (
                af.time_base,
                rescale_q(i64::from(af.nb_samples), sample_tb, af.time_base),
            )
        } else {
            (sample_tb, i64::from(af.nb_samples))
        };

        let mut pkt = Packet::from_data(Bytes::from(out));
        pkt.pts = af.pts;
        pkt.dts = af.pts;
        pkt.duration = duration;
        pkt.time_base = time_base;
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
        self.short_frame_seen = false;
    }
}
