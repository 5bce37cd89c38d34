//! 逐流转码管线: 解码 -> 滤镜 -> (音频重组) -> 编码 -> 写出.
//!
//! 状态机:
//!
//! ```text
//! Streaming --解码器结束--> DecoderDraining --滤镜结束--> FilterDraining
//!     --重组余量写出, 编码器冲洗--> EncoderDraining --编码器结束--> Done
//! ```
//!
//! 每个数据包在返回前把解码、滤镜、编码三级的输出全部拉空, 因此写出顺序
//! 就是编码器的输出顺序. `NeedMoreInput` 只结束当前这一轮拉取.
//! 任何真正的错误都原样返回, 由编排层中止整个任务.

use std::fmt;

use log::{debug, info, warn};
use reel_codec::{AudioFrame, CodecCapabilities, Decoder, Encoder, Frame, Packet};
use reel_core::{MediaType, NOPTS_VALUE, Rational, ReelError, ReelResult, rescale_q};
use reel_filter::FilterGraph;

use crate::adapter::{DecodeAdapter, EncodeAdapter, FilterStage, Pull, Push, StageAdapter};
use crate::fifo::AudioFifo;

/// 压缩数据包的写出端, 通常是封装器
pub trait PacketSink {
    fn write_packet(&mut self, packet: Packet) -> ReelResult<()>;
}

impl PacketSink for Vec<Packet> {
    fn write_packet(&mut self, packet: Packet) -> ReelResult<()> {
        self.push(packet);
        Ok(())
    }
}

/// 管线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 正常处理
    Streaming,
    /// 解码器已冲洗或自行结束, 正在拉出剩余帧
    DecoderDraining,
    /// 滤镜已冲洗, 正在拉出剩余帧
    FilterDraining,
    /// 编码器已冲洗, 正在写出剩余数据包
    EncoderDraining,
    /// 编码器已耗尽, 不再产生任何输出
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Streaming => "STREAMING",
            Self::DecoderDraining => "DECODER_DRAINING",
            Self::FilterDraining => "FILTER_DRAINING",
            Self::EncoderDraining => "ENCODER_DRAINING",
            Self::Done => "DONE",
        };
        write!(f, "{name}")
    }
}

/// 管线计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// 送入的数据包
    pub packets_in: u64,
    /// 解码器结束后到达而被丢弃的数据包
    pub packets_discarded: u64,
    pub frames_decoded: u64,
    /// 解码得到的每声道采样数 (仅音频)
    pub samples_decoded: u64,
    /// 送入编码器的帧
    pub frames_encoded: u64,
    /// 送入编码器的每声道采样数 (仅音频)
    pub samples_encoded: u64,
    /// 写出的数据包
    pub packets_out: u64,
}

/// 管线的流索引与时间基
#[derive(Debug, Clone, Copy)]
pub struct PipelineTiming {
    /// 输出流索引, 写出的每个数据包都以此标记
    pub output_index: usize,
    pub input_time_base: Rational,
    /// 解码与编码共用的工作时间基
    pub working_time_base: Rational,
    pub output_time_base: Rational,
}

/// 单条流的转码管线
pub struct StreamPipeline {
    media_type: MediaType,
    timing: PipelineTiming,
    decoder: DecodeAdapter,
    filter: FilterStage,
    encoder: EncodeAdapter,
    /// 编码器要求的定长帧, `None` 表示不重组
    reframe_size: Option<usize>,
    fifo: Option<AudioFifo>,
    /// 合成时间戳计数器, 以采样数计
    next_sample: Option<i64>,
    state: PipelineState,
    decoder_drained: bool,
    filter_drained: bool,
    encoder_drained: bool,
    stats: PipelineStats,
}

impl StreamPipeline {
    /// 组装管线
    ///
    /// 编解码器必须已经打开. `decoder_frame_size` 是解码端的自然帧长 (来自输入流参数,
    /// 0 表示未知或可变). 音频满足以下条件时启用重组:
    /// 编码器不接受可变帧长, 要求的帧长大于 0, 且与解码端帧长不同.
    pub fn new(
        media_type: MediaType,
        timing: PipelineTiming,
        decoder: Box<dyn Decoder>,
        filter: FilterGraph,
        encoder: Box<dyn Encoder>,
        decoder_frame_size: u32,
    ) -> ReelResult<Self> {
        if !timing.working_time_base.is_valid() {
            return Err(ReelError::InvalidArgument(format!(
                "流 #{} 的工作时间基无效: {}",
                timing.output_index, timing.working_time_base
            )));
        }
        let encoder_frame_size = encoder.frame_size();
        let reframe = media_type == MediaType::Audio
            && !encoder
                .capabilities()
                .contains(CodecCapabilities::VARIABLE_FRAME_SIZE)
            && encoder_frame_size > 0
            && decoder_frame_size != encoder_frame_size;

        debug!(
            "流 #{}: {} -> [{}] -> {}, 时间基 {} -> {} -> {}{}",
            timing.output_index,
            decoder.name(),
            filter.describe(),
            encoder.name(),
            timing.input_time_base,
            timing.working_time_base,
            timing.output_time_base,
            if reframe {
                format!(", 重组为 {encoder_frame_size} 采样/帧")
            } else {
                String::new()
            },
        );

        Ok(Self {
            media_type,
            timing,
            decoder: StageAdapter::new(decoder),
            filter: StageAdapter::new(filter),
            encoder: StageAdapter::new(encoder),
            reframe_size: reframe.then_some(encoder_frame_size as usize),
            fifo: None,
            next_sample: None,
            state: PipelineState::Streaming,
            decoder_drained: false,
            filter_drained: false,
            encoder_drained: false,
            stats: PipelineStats::default(),
        })
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn timing(&self) -> PipelineTiming {
        self.timing
    }

    pub fn is_reframing(&self) -> bool {
        self.reframe_size.is_some()
    }

    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    pub fn filter_description(&self) -> String {
        self.filter.get_ref().describe()
    }

    pub fn is_decoder_drained(&self) -> bool {
        self.decoder_drained
    }

    pub fn is_filter_drained(&self) -> bool {
        self.filter_drained
    }

    pub fn is_encoder_drained(&self) -> bool {
        self.encoder_drained
    }

    /// 封装器写入头部后可能改变输出时间基
    pub fn set_output_time_base(&mut self, time_base: Rational) {
        self.timing.output_time_base = time_base;
    }

    /// 处理一个输入数据包, 产生的数据包全部写入 `sink` 后才返回
    pub fn process_packet(&mut self, packet: &Packet, sink: &mut dyn PacketSink) -> ReelResult<()> {
        self.stats.packets_in += 1;
        if self.state != PipelineState::Streaming {
            self.stats.packets_discarded += 1;
            warn!(
                "流 #{} 处于 {} 状态, 丢弃 pts={} 的数据包",
                self.timing.output_index, self.state, packet.pts
            );
            return Ok(());
        }
        if packet.is_empty() {
            // 空包对解码器意味着冲洗, 不能原样送入
            self.stats.packets_discarded += 1;
            warn!("流 #{} 收到空数据包, 已跳过", self.timing.output_index);
            return Ok(());
        }

        let mut packet = packet.clone();
        let from = if packet.time_base.is_valid() {
            packet.time_base
        } else {
            self.timing.input_time_base
        };
        packet.rescale_ts(from, self.timing.working_time_base);
        self.feed_decoder(Some(&packet), sink)
    }

    /// 执行完整的冲洗序列, 到达 `Done` 后再调用不产生任何输出
    pub fn drain(&mut self, sink: &mut dyn PacketSink) -> ReelResult<()> {
        if self.state == PipelineState::Done {
            return Ok(());
        }
        info!("流 #{} 开始冲洗", self.timing.output_index);

        if !self.decoder_drained {
            self.set_state(PipelineState::DecoderDraining);
            self.feed_decoder(None, sink)?;
        }
        if !self.filter_drained {
            self.set_state(PipelineState::FilterDraining);
            self.feed_filter(None, sink)?;
        }
        if !self.encoder_drained {
            self.set_state(PipelineState::EncoderDraining);
            self.flush_fifo(sink)?;
            self.feed_encoder(None, sink)?;
        }
        self.set_state(PipelineState::Done);

        let s = &self.stats;
        info!(
            "流 #{} 冲洗完成: 解码 {} 帧, 编码 {} 帧, 写出 {} 个数据包",
            self.timing.output_index, s.frames_decoded, s.frames_encoded, s.packets_out
        );
        Ok(())
    }

    fn set_state(&mut self, state: PipelineState) {
        if self.state != state {
            debug!(
                "流 #{}: {} -> {}",
                self.timing.output_index, self.state, state
            );
            self.state = state;
        }
    }

    fn feed_decoder(&mut self, packet: Option<&Packet>, sink: &mut dyn PacketSink) -> ReelResult<()> {
        loop {
            match self.decoder.push(packet)? {
                Push::Accepted => break,
                Push::TryPullFirst => {
                    if self.pump_decoder(sink)? == 0 {
                        return Err(stalled(self.decoder.name()));
                    }
                }
            }
        }
        self.pump_decoder(sink)?;
        Ok(())
    }

    /// 拉空解码器, 返回取出的帧数
    fn pump_decoder(&mut self, sink: &mut dyn PacketSink) -> ReelResult<usize> {
        let mut pulled = 0;
        loop {
            match self.decoder.pull()? {
                Pull::Ready(frame) => {
                    pulled += 1;
                    self.stats.frames_decoded += 1;
                    self.stats.samples_decoded += u64::from(frame.nb_samples());
                    self.feed_filter(Some(&frame), sink)?;
                }
                Pull::NeedMoreInput => return Ok(pulled),
                Pull::EndOfStream => {
                    self.decoder_drained = true;
                    if self.state == PipelineState::Streaming {
                        self.set_state(PipelineState::DecoderDraining);
                    }
                    return Ok(pulled);
                }
            }
        }
    }

    fn feed_filter(&mut self, frame: Option<&Frame>, sink: &mut dyn PacketSink) -> ReelResult<()> {
        loop {
            match self.filter.push(frame)? {
                Push::Accepted => break,
                Push::TryPullFirst => {
                    if self.pump_filter(sink)? == 0 {
                        return Err(stalled(self.filter.name()));
                    }
                }
            }
        }
        self.pump_filter(sink)?;
        Ok(())
    }

    fn pump_filter(&mut self, sink: &mut dyn PacketSink) -> ReelResult<usize> {
        let mut pulled = 0;
        loop {
            match self.filter.pull()? {
                Pull::Ready(frame) => {
                    pulled += 1;
                    self.route_filtered(frame, sink)?;
                }
                Pull::NeedMoreInput => return Ok(pulled),
                Pull::EndOfStream => {
                    self.filter_drained = true;
                    if self.state == PipelineState::DecoderDraining {
                        self.set_state(PipelineState::FilterDraining);
                    }
                    return Ok(pulled);
                }
            }
        }
    }

    /// 滤镜输出进入编码器, 需要重组时先写入重组缓冲
    fn route_filtered(&mut self, frame: Frame, sink: &mut dyn PacketSink) -> ReelResult<()> {
        let Some(frame_size) = self.reframe_size else {
            return self.feed_encoder(Some(&frame), sink);
        };
        let Frame::Audio(audio) = &frame else {
            return Err(ReelError::Internal("重组缓冲只接受音频帧".into()));
        };

        if self.fifo.is_none() {
            self.fifo = Some(AudioFifo::for_frame(audio)?);
        }
        if self.next_sample.is_none() {
            self.next_sample = Some(self.seed_sample(audio));
        }
        if let Some(fifo) = self.fifo.as_mut() {
            fifo.write(audio)?;
        }

        loop {
            let chunk = match self.fifo.as_mut() {
                Some(fifo) if fifo.can_read(frame_size) => fifo.read(frame_size)?,
                _ => return Ok(()),
            };
            self.emit_reframed(chunk, sink)?;
        }
    }

    /// 写出重组缓冲的剩余采样 (最后一个短帧)
    fn flush_fifo(&mut self, sink: &mut dyn PacketSink) -> ReelResult<()> {
        let Some(tail) = self.fifo.as_mut().and_then(AudioFifo::drain) else {
            return Ok(());
        };
        debug!(
            "流 #{}: 重组缓冲剩余 {} 个采样",
            self.timing.output_index, tail.nb_samples
        );
        self.emit_reframed(tail, sink)
    }

    /// 合成时间戳的起点: 第一帧的时间戳换算为采样数, 无时间戳时为 0
    fn seed_sample(&self, frame: &AudioFrame) -> i64 {
        if frame.pts == NOPTS_VALUE || frame.sample_rate == 0 {
            return 0;
        }
        let from = if frame.time_base.is_valid() {
            frame.time_base
        } else {
            self.timing.working_time_base
        };
        rescale_q(frame.pts, from, sample_time_base(frame.sample_rate))
    }

    /// 为重组后的帧赋合成时间戳, 计数器按输出采样数递增
    fn emit_reframed(
        &mut self,
        mut frame: AudioFrame,
        sink: &mut dyn PacketSink,
    ) -> ReelResult<()> {
        let sample_tb = sample_time_base(frame.sample_rate);
        let counter = self.next_sample.unwrap_or(0);
        frame.pts = rescale_q(counter, sample_tb, self.timing.working_time_base);
        frame.time_base = self.timing.working_time_base;
        frame.duration = rescale_q(
            i64::from(frame.nb_samples),
            sample_tb,
            self.timing.working_time_base,
        );
        self.next_sample = Some(counter + i64::from(frame.nb_samples));
        self.feed_encoder(Some(&Frame::Audio(frame)), sink)
    }

    fn feed_encoder(&mut self, frame: Option<&Frame>, sink: &mut dyn PacketSink) -> ReelResult<()> {
        if let Some(frame) = frame {
            self.stats.frames_encoded += 1;
            self.stats.samples_encoded += u64::from(frame.nb_samples());
        }
        loop {
            match self.encoder.push(frame)? {
                Push::Accepted => break,
                Push::TryPullFirst => {
                    if self.pump_encoder(sink)? == 0 {
                        return Err(stalled(self.encoder.name()));
                    }
                }
            }
        }
        self.pump_encoder(sink)?;
        Ok(())
    }

    fn pump_encoder(&mut self, sink: &mut dyn PacketSink) -> ReelResult<usize> {
        let mut pulled = 0;
        loop {
            match self.encoder.pull()? {
                Pull::Ready(packet) => {
                    pulled += 1;
                    self.write_out(packet, sink)?;
                }
                Pull::NeedMoreInput => return Ok(pulled),
                Pull::EndOfStream => {
                    self.encoder_drained = true;
                    self.set_state(PipelineState::Done);
                    return Ok(pulled);
                }
            }
        }
    }

    /// 标记输出流索引, 从工作时间基换算到输出时间基后写出
    fn write_out(&mut self, mut packet: Packet, sink: &mut dyn PacketSink) -> ReelResult<()> {
        let from = if packet.time_base.is_valid() {
            packet.time_base
        } else {
            self.timing.working_time_base
        };
        packet.stream_index = self.timing.output_index;
        packet.rescale_ts(from, self.timing.output_time_base);
        self.stats.packets_out += 1;
        sink.write_packet(packet)
    }
}

fn sample_time_base(sample_rate: u32) -> Rational {
    Rational::new(1, sample_rate.min(i32::MAX as u32) as i32)
}

/// 阶段拒绝输入却没有任何输出可取, 继续重试只会死循环
fn stalled(stage: &str) -> ReelError {
    ReelError::Internal(format!("{stage}: 拒绝输入且没有可取出的输出"))
}
