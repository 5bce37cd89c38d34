//! 编解码器与滤镜的统一推/拉适配层.
//!
//! 编解码器和滤镜图用 `Err(NeedMoreData)` / `Err(Eof)` 表达流控,
//! 这里把它们转换成带标签的 [`Push`] / [`Pull`] 结果, 让管线状态机
//! 可以穷尽匹配, 真正的错误仍走 `Err`.

use reel_codec::{Decoder, Encoder, Frame, Packet};
use reel_core::{ReelError, ReelResult};
use reel_filter::FilterGraph;

/// 推送结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// 输入已被接受
    Accepted,
    /// 内部缓冲已满, 需要先拉取输出再重试
    TryPullFirst,
}

/// 拉取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull<T> {
    Ready(T),
    /// 需要更多输入
    NeedMoreInput,
    /// 冲洗完毕, 之后永远返回此值
    EndOfStream,
}

/// 可推/拉的处理阶段
///
/// 送入 `None` 表示冲洗.
pub trait Stage {
    type Input;
    type Output;

    /// 用于日志的阶段名
    fn stage_name(&self) -> &str;

    fn send(&mut self, input: Option<&Self::Input>) -> ReelResult<()>;

    fn receive(&mut self) -> ReelResult<Self::Output>;
}

impl Stage for Box<dyn Decoder> {
    type Input = Packet;
    type Output = Frame;

    fn stage_name(&self) -> &str {
        self.name()
    }

    fn send(&mut self, input: Option<&Packet>) -> ReelResult<()> {
        match input {
            Some(packet) => self.send_packet(packet),
            None => self.send_packet(&Packet::empty()),
        }
    }

    fn receive(&mut self) -> ReelResult<Frame> {
        self.receive_frame()
    }
}

impl Stage for Box<dyn Encoder> {
    type Input = Frame;
    type Output = Packet;

    fn stage_name(&self) -> &str {
        self.name()
    }

    fn send(&mut self, input: Option<&Frame>) -> ReelResult<()> {
        self.send_frame(input)
    }

    fn receive(&mut self) -> ReelResult<Packet> {
        self.receive_packet()
    }
}

impl Stage for FilterGraph {
    type Input = Frame;
    type Output = Frame;

    fn stage_name(&self) -> &str {
        "filtergraph"
    }

    fn send(&mut self, input: Option<&Frame>) -> ReelResult<()> {
        self.send_frame(input)
    }

    fn receive(&mut self) -> ReelResult<Frame> {
        self.receive_frame()
    }
}

/// 适配器: 在任意 [`Stage`] 上实现推/拉/冲洗协议
///
/// - 送入 `None` 且被接受后进入冲洗状态, 之后再送入数据是内部错误
/// - 冲洗状态下阶段报告 `NeedMoreData` 视为已耗尽
/// - 一旦返回 `EndOfStream`, 之后的拉取不再访问底层阶段
pub struct StageAdapter<S: Stage> {
    stage: S,
    draining: bool,
    finished: bool,
}

pub type DecodeAdapter = StageAdapter<Box<dyn Decoder>>;
pub type EncodeAdapter = StageAdapter<Box<dyn Encoder>>;
pub type FilterStage = StageAdapter<FilterGraph>;

impl<S: Stage> StageAdapter<S> {
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            draining: false,
            finished: false,
        }
    }

    pub fn push(&mut self, input: Option<&S::Input>) -> ReelResult<Push> {
        if self.draining || self.finished {
            return match input {
                Some(_) => Err(ReelError::Internal(format!(
                    "{}: 冲洗之后仍送入数据",
                    self.stage.stage_name()
                ))),
                None => Ok(Push::Accepted),
            };
        }
        match self.stage.send(input) {
            Ok(()) => {
                if input.is_none() {
                    self.draining = true;
                }
                Ok(Push::Accepted)
            }
            Err(e) if !e.is_flow_control() => Err(e),
            Err(ReelError::NeedMoreData) => Ok(Push::TryPullFirst),
            // 余下只有 Eof: 冲洗信号视为已接受, 数据则说明阶段提前结束
            Err(_) if input.is_none() => {
                self.draining = true;
                Ok(Push::Accepted)
            }
            Err(_) => Err(ReelError::Internal(format!(
                "{}: 已结束的阶段仍收到数据",
                self.stage.stage_name()
            ))),
        }
    }

    pub fn pull(&mut self) -> ReelResult<Pull<S::Output>> {
        if self.finished {
            return Ok(Pull::EndOfStream);
        }
        match self.stage.receive() {
            Ok(output) => Ok(Pull::Ready(output)),
            Err(e) if !e.is_flow_control() => Err(e),
            Err(ReelError::NeedMoreData) if !self.draining => Ok(Pull::NeedMoreInput),
            // Eof, 或冲洗状态下的 NeedMoreData
            Err(_) => {
                self.finished = true;
                Ok(Pull::EndOfStream)
            }
        }
    }

    /// 是否已送入冲洗信号
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// 是否已返回过 `EndOfStream`
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn name(&self) -> &str {
        self.stage.stage_name()
    }

    pub fn get_ref(&self) -> &S {
        &self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// 可配置容量的测试阶段, 冲洗后返回 `NeedMoreData` 而不是 `Eof`
    struct Queue {
        items: VecDeque<u32>,
        capacity: usize,
        fail_on: Option<u32>,
    }

    impl Queue {
        fn new(capacity: usize) -> Self {
            Self {
                items: VecDeque::new(),
                capacity,
                fail_on: None,
            }
        }
    }

    impl Stage for Queue {
        type Input = u32;
        type Output = u32;

        fn stage_name(&self) -> &str {
            "queue"
        }

        fn send(&mut self, input: Option<&u32>) -> ReelResult<()> {
            if self.items.len() >= self.capacity {
                return Err(ReelError::NeedMoreData);
            }
            match input {
                Some(v) if Some(*v) == self.fail_on => Err(ReelError::InvalidData("坏数据".into())),
                Some(v) => {
                    self.items.push_back(*v);
                    Ok(())
                }
                None => Ok(()),
            }
        }

        fn receive(&mut self) -> ReelResult<u32> {
            self.items.pop_front().ok_or(ReelError::NeedMoreData)
        }
    }

    #[test]
    fn test_adapter_try_pull_first() {
        let mut adapter = StageAdapter::new(Queue::new(1));
        assert_eq!(adapter.push(Some(&1)).unwrap(), Push::Accepted);
        assert_eq!(adapter.push(Some(&2)).unwrap(), Push::TryPullFirst);
        assert_eq!(adapter.pull().unwrap(), Pull::Ready(1));
        assert_eq!(adapter.push(Some(&2)).unwrap(), Push::Accepted);
        assert_eq!(adapter.pull().unwrap(), Pull::Ready(2));
        assert_eq!(adapter.pull().unwrap(), Pull::NeedMoreInput);
    }

    #[test]
    fn test_adapter_冲洗后数据不足视为结束() {
        let mut adapter = StageAdapter::new(Queue::new(4));
        adapter.push(Some(&7)).unwrap();
        adapter.push(None).unwrap();
        assert!(adapter.is_draining());
        assert_eq!(adapter.pull().unwrap(), Pull::Ready(7));
        assert_eq!(adapter.pull().unwrap(), Pull::EndOfStream);
        assert!(adapter.is_finished());
        // 结束是永久的
        assert_eq!(adapter.pull().unwrap(), Pull::EndOfStream);
    }

    #[test]
    fn test_adapter_push_after_flush_is_internal() {
        let mut adapter = StageAdapter::new(Queue::new(4));
        adapter.push(None).unwrap();
        assert_eq!(adapter.push(None).unwrap(), Push::Accepted);
        assert!(matches!(adapter.push(Some(&1)), Err(ReelError::Internal(_))));
    }

    #[test]
    fn test_adapter_rejected_flush_not_draining() {
        let mut adapter = StageAdapter::new(Queue::new(1));
        adapter.push(Some(&1)).unwrap();
        assert_eq!(adapter.push(None).unwrap(), Push::TryPullFirst);
        assert!(!adapter.is_draining());
        assert_eq!(adapter.pull().unwrap(), Pull::Ready(1));
        assert_eq!(adapter.push(None).unwrap(), Push::Accepted);
        assert_eq!(adapter.pull().unwrap(), Pull::EndOfStream);
    }

    #[test]
    fn test_adapter_propagates_errors() {
        let mut queue = Queue::new(4);
        queue.fail_on = Some(3);
        let mut adapter = StageAdapter::new(queue);
        assert!(matches!(adapter.push(Some(&3)), Err(ReelError::InvalidData(_))));
    }

    /// 已经结束的阶段: 送入与取出都报告 `Eof`, 取出时可改为报告真正的错误
    struct Ended {
        receive_error: Option<ReelError>,
    }

    impl Stage for Ended {
        type Input = u32;
        type Output = u32;

        fn stage_name(&self) -> &str {
            "ended"
        }

        fn send(&mut self, _input: Option<&u32>) -> ReelResult<()> {
            Err(ReelError::Eof)
        }

        fn receive(&mut self) -> ReelResult<u32> {
            Err(self.receive_error.take().unwrap_or(ReelError::Eof))
        }
    }

    #[test]
    fn test_adapter_eof_classification() {
        let mut adapter = StageAdapter::new(Ended { receive_error: None });
        assert!(matches!(adapter.push(Some(&1)), Err(ReelError::Internal(_))));
        assert!(!adapter.is_draining());
        assert_eq!(adapter.push(None).unwrap(), Push::Accepted);
        assert!(adapter.is_draining());
        assert_eq!(adapter.pull().unwrap(), Pull::EndOfStream);
        assert!(adapter.is_finished());
    }

    #[test]
    fn test_adapter_receive_error_is_not_end_of_stream() {
        let mut adapter = StageAdapter::new(Ended {
            receive_error: Some(ReelError::Codec("坏帧".into())),
        });
        assert!(matches!(adapter.pull(), Err(ReelError::Codec(_))));
        assert!(!adapter.is_finished());
        assert_eq!(adapter.pull().unwrap(), Pull::EndOfStream);
    }

    #[test]
    fn test_decode_adapter_pcm_flush() {
        use reel_codec::{AudioCodecParams, CodecId, CodecParameters, CodecParamsType, CodecRegistry};
        use reel_core::{ChannelLayout, SampleFormat};

        let registry = CodecRegistry::with_builtin();
        let mut decoder = registry.create_decoder(CodecId::PcmS16le).unwrap();
        decoder
            .open(&CodecParameters {
                codec_id: CodecId::PcmS16le,
                extra_data: Vec::new(),
                bit_rate: 0,
                params: CodecParamsType::Audio(AudioCodecParams {
                    sample_rate: 8000,
                    channel_layout: ChannelLayout::MONO,
                    sample_format: SampleFormat::S16,
                    frame_size: 0,
                }),
            })
            .unwrap();
        let mut adapter: DecodeAdapter = StageAdapter::new(decoder);
        assert_eq!(adapter.name(), "pcm_s16le");

        let packet = Packet::from_data(vec![0u8; 8]);
        assert_eq!(adapter.push(Some(&packet)).unwrap(), Push::Accepted);
        assert_eq!(adapter.push(None).unwrap(), Push::TryPullFirst);
        assert!(matches!(adapter.pull().unwrap(), Pull::Ready(f) if f.nb_samples() == 4));
        assert_eq!(adapter.push(None).unwrap(), Push::Accepted);
        assert!(matches!(adapter.pull().unwrap(), Pull::EndOfStream));
        assert!(adapter.is_finished());
    }
}
