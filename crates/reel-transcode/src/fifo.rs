//! 音频重组缓冲 (FIFO).
//!
//! 把解码端任意大小的音频帧重新切分为编码器要求的定长帧.
//! 每个平面一段 `Vec<u8>`, 读取只移动游标, 已消费的前缀占多数时再整体前移.
//! 不变式: `len() == total_written() - total_read()`, 严格先进先出.

use reel_codec::AudioFrame;
use reel_core::{ChannelLayout, ReelError, ReelResult, SampleFormat};

/// 音频重组缓冲
#[derive(Debug)]
pub struct AudioFifo {
    sample_format: SampleFormat,
    channel_layout: ChannelLayout,
    sample_rate: u32,
    planes: Vec<Vec<u8>>,
    /// 每个平面中已读取的字节数
    head: usize,
    /// 每个平面中一个采样时刻的字节数
    stride: usize,
    total_written: u64,
    total_read: u64,
}

impl AudioFifo {
    pub fn new(
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
        sample_rate: u32,
    ) -> ReelResult<Self> {
        let channels = channel_layout.channels;
        let stride = sample_format.plane_stride(channels);
        if stride == 0 {
            return Err(ReelError::InvalidArgument(format!(
                "无法为 {sample_format} / {channels} 声道创建重组缓冲"
            )));
        }
        Ok(Self {
            sample_format,
            channel_layout,
            sample_rate,
            planes: vec![Vec::new(); sample_format.plane_count(channels)],
            head: 0,
            stride,
            total_written: 0,
            total_read: 0,
        })
    }

    /// 以第一帧的格式创建
    pub fn for_frame(frame: &AudioFrame) -> ReelResult<Self> {
        Self::new(frame.sample_format, frame.channel_layout, frame.sample_rate)
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn channel_layout(&self) -> ChannelLayout {
        self.channel_layout
    }

    /// 追加一帧的全部采样
    pub fn write(&mut self, frame: &AudioFrame) -> ReelResult<()> {
        if frame.sample_format != self.sample_format || frame.channel_layout != self.channel_layout
        {
            return Err(ReelError::InvalidArgument(format!(
                "重组缓冲格式为 {} {}, 收到 {} {}",
                self.sample_format, self.channel_layout, frame.sample_format, frame.channel_layout
            )));
        }
        let bytes = frame.nb_samples as usize * self.stride;
        if frame.data.len() != self.planes.len() {
            return Err(ReelError::InvalidData(format!(
                "音频帧应有 {} 个平面, 实际 {}",
                self.planes.len(),
                frame.data.len()
            )));
        }
        if let Some(short) = frame.data.iter().find(|p| p.len() < bytes) {
            return Err(ReelError::InvalidData(format!(
                "音频平面数据不足: 需要 {} 字节, 实际 {}",
                bytes,
                short.len()
            )));
        }

        self.compact();
        reserve_planes(&mut self.planes, bytes)?;
        for (plane, src) in self.planes.iter_mut().zip(&frame.data) {
            plane.extend_from_slice(&src[..bytes]);
        }
        self.total_written += u64::from(frame.nb_samples);
        Ok(())
    }

    /// 缓冲的每声道采样数
    pub fn len(&self) -> usize {
        self.planes
            .first()
            .map_or(0, |p| (p.len() - self.head) / self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn can_read(&self, nb_samples: usize) -> bool {
        self.len() >= nb_samples
    }

    /// 取出恰好 `nb_samples` 个采样
    ///
    /// 缓冲不足时返回 `Underflow`, 调用方应先检查 [`can_read`](Self::can_read).
    /// 输出帧不带时间戳, 由调用方赋值.
    pub fn read(&mut self, nb_samples: usize) -> ReelResult<AudioFrame> {
        let available = self.len();
        if nb_samples > available {
            return Err(ReelError::Underflow {
                requested: nb_samples,
                available,
            });
        }
        Ok(self.take(nb_samples))
    }

    /// 取出剩余全部采样, 缓冲为空时返回 `None`
    pub fn drain(&mut self) -> Option<AudioFrame> {
        match self.len() {
            0 => None,
            n => Some(self.take(n)),
        }
    }

    /// 累计写入的采样数
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// 累计读出的采样数
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    fn take(&mut self, nb_samples: usize) -> AudioFrame {
        let bytes = nb_samples * self.stride;
        let mut frame = AudioFrame::new(
            nb_samples as u32,
            self.sample_rate,
            self.sample_format,
            self.channel_layout,
        );
        for (dst, plane) in frame.data.iter_mut().zip(&self.planes) {
            *dst = plane[self.head..self.head + bytes].to_vec();
        }
        frame.duration = nb_samples as i64;
        self.head += bytes;
        self.total_read += nb_samples as u64;
        if self.head == self.planes.first().map_or(0, Vec::len) {
            for plane in &mut self.planes {
                plane.clear();
            }
            self.head = 0;
        }
        frame
    }

    /// 已消费的前缀不少于一半时整体前移
    fn compact(&mut self) {
        let used = self.planes.first().map_or(0, Vec::len);
        if self.head == 0 || self.head * 2 < used {
            return;
        }
        for plane in &mut self.planes {
            plane.drain(..self.head);
        }
        self.head = 0;
    }
}

/// 先为所有平面预留空间, 任一平面失败时不写入任何平面
fn reserve_planes(planes: &mut [Vec<u8>], additional: usize) -> ReelResult<()> {
    for plane in planes.iter_mut() {
        plane.try_reserve(additional)?;
    }
    Ok(())
}
