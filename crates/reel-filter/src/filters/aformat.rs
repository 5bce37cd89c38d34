//! 音频格式转换滤镜.
//!
//! 对标 FFmpeg 的 `aformat`, 把任意交错/平面采样格式和声道数转换为目标格式.
//! 不做重采样: 设定了采样率时, 采样率不符的帧以 `Unsupported` 拒绝.

use log::debug;
use reel_codec::frame::{AudioFrame, Frame};
use reel_core::{ChannelLayout, ReelError, ReelResult, SampleFormat};

use crate::sample;
use crate::{Filter, FrameSlot};

/// 音频格式转换滤镜
#[derive(Debug)]
pub struct AformatFilter {
    sample_format: SampleFormat,
    channel_layout: ChannelLayout,
    /// 期望的采样率, `None` 表示不检查
    sample_rate: Option<u32>,
    slot: FrameSlot,
    /// 已记录过实际转换路径
    logged: bool,
}

impl AformatFilter {
    pub fn new(sample_format: SampleFormat, channel_layout: ChannelLayout) -> Self {
        Self {
            sample_format,
            channel_layout,
            sample_rate: None,
            slot: FrameSlot::default(),
            logged: false,
        }
    }

    /// 要求输入帧具有指定采样率
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    fn convert(&mut self, frame: &AudioFrame) -> ReelResult<AudioFrame> {
        if let Some(rate) = self.sample_rate {
            if frame.sample_rate != rate {
                return Err(ReelError::Unsupported(format!(
                    "aformat 不做重采样: 输入 {} Hz, 目标 {} Hz",
                    frame.sample_rate, rate
                )));
            }
        }
        if frame.sample_format == self.sample_format && frame.channel_layout == self.channel_layout
        {
            return Ok(frame.clone());
        }
        if !self.logged {
            debug!(
                "aformat: {} {} -> {} {}",
                frame.sample_format, frame.channel_layout, self.sample_format, self.channel_layout
            );
            self.logged = true;
        }

        let samples = sample::to_f64(frame)?;
        let mixed = sample::mix_channels(
            &samples,
            frame.channel_layout.channels as usize,
            self.channel_layout.channels as usize,
        );
        Ok(AudioFrame {
            data: sample::from_f64(&mixed, self.channel_layout.channels, self.sample_format),
            nb_samples: frame.nb_samples,
            sample_rate: frame.sample_rate,
            sample_format: self.sample_format,
            channel_layout: self.channel_layout,
            pts: frame.pts,
            time_base: frame.time_base,
            duration: frame.duration,
        })
    }
}

impl Filter for AformatFilter {
    fn name(&self) -> &str {
        "aformat"
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        let Some(frame) = frame else {
            self.slot.start_draining();
            return Ok(());
        };
        if self.slot.is_full() {
            return Err(ReelError::NeedMoreData);
        }
        match frame {
            Frame::Audio(af) => {
                let converted = self.convert(af)?;
                self.slot.put(Frame::Audio(converted))
            }
            Frame::Video(_) => Err(ReelError::InvalidArgument("aformat 滤镜仅支持音频帧".into())),
        }
    }

    fn receive_frame(&mut self) -> ReelResult<Frame> {
        self.slot.take()
    }

    fn flush(&mut self) {
        self.slot.reset();
    }
}
