//! # reel-filter
//!
//! 滤镜框架: 线性滤镜图 (FilterGraph) 与转码管线用到的格式归一化滤镜.
//!
//! 滤镜与编解码器使用同一套推/拉协议:
//! - `send_frame(Some(..))` 送入一帧, 槽位已满时返回 `NeedMoreData`
//! - `send_frame(None)` 进入冲洗状态
//! - `receive_frame()` 取出一帧, 无输出时返回 `NeedMoreData`, 冲洗完毕返回 `Eof`
//!
//! ## 内置滤镜
//!
//! - **通用**: null (原样透传)
//! - **音频**: aformat (采样格式/声道数转换), volume (音量)
//! - **视频**: format (像素格式/尺寸校验)
//!
//! ```rust
//! use reel_filter::FilterGraph;
//! use reel_filter::filters::volume::VolumeFilter;
//!
//! let mut graph = FilterGraph::new();
//! graph.add_filter(Box::new(VolumeFilter::new(2.0)));
//! assert_eq!(graph.filter_names(), vec!["volume"]);
//! ```

pub mod builder;
pub mod filters;
pub(crate) mod sample;

use std::collections::VecDeque;
use std::fmt;

use reel_codec::frame::Frame;
use reel_core::{ReelError, ReelResult};

pub use builder::{AudioFormatSpec, VideoFormatSpec, build_audio_graph, build_video_graph};

/// 滤镜 trait
///
/// 滤镜只做格式层面的变换, 不改变帧的时间戳.
pub trait Filter: Send {
    fn name(&self) -> &str;

    /// 送入一帧, `None` 表示冲洗
    ///
    /// - `Err(ReelError::NeedMoreData)`: 上一帧尚未取走
    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()>;

    /// 取出一帧
    ///
    /// - `Err(ReelError::NeedMoreData)`: 需要送入更多帧
    /// - `Err(ReelError::Eof)`: 冲洗后所有帧已取出
    fn receive_frame(&mut self) -> ReelResult<Frame>;

    /// 丢弃内部状态, 回到初始状态
    fn flush(&mut self);
}

/// 单帧输出槽, 内置滤镜共用
#[derive(Debug, Default)]
pub(crate) struct FrameSlot {
    frame: Option<Frame>,
    draining: bool,
}

impl FrameSlot {
    pub(crate) fn put(&mut self, frame: Frame) -> ReelResult<()> {
        if self.draining {
            return Err(ReelError::InvalidArgument("冲洗后不能再送入帧".into()));
        }
        if self.frame.is_some() {
            return Err(ReelError::NeedMoreData);
        }
        self.frame = Some(frame);
        Ok(())
    }

    /// 槽位中是否有未取走的帧
    pub(crate) fn is_full(&self) -> bool {
        self.frame.is_some()
    }

    pub(crate) fn start_draining(&mut self) {
        self.draining = true;
    }

    pub(crate) fn take(&mut self) -> ReelResult<Frame> {
        match self.frame.take() {
            Some(frame) => Ok(frame),
            None if self.draining => Err(ReelError::Eof),
            None => Err(ReelError::NeedMoreData),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.frame = None;
        self.draining = false;
    }
}

/// 滤镜图
///
/// 线性链: 帧从第一个滤镜进入, 依次流经每个滤镜后从最后一个滤镜取出.
/// 取帧时按需从上游拉取, 上游报告 `Eof` 时向下游传递冲洗信号.
/// 空滤镜图原样透传.
#[derive(Default)]
pub struct FilterGraph {
    filters: Vec<Box<dyn Filter>>,
    /// 空滤镜图的透传队列
    passthrough: VecDeque<Frame>,
    draining: bool,
}

impl fmt::Debug for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterGraph")
            .field("filters", &self.filter_names())
            .field("queued", &self.passthrough.len())
            .field("draining", &self.draining)
            .finish()
    }
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// 滤镜链的文字描述, 如 `aformat,volume`
    pub fn describe(&self) -> String {
        if self.filters.is_empty() {
            return "(透传)".into();
        }
        self.filter_names().join(",")
    }

    /// 送入一帧, `None` 表示冲洗整条链
    pub fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        if self.draining {
            return Err(ReelError::InvalidArgument("滤镜图冲洗后不能再送入帧".into()));
        }
        if frame.is_none() {
            self.draining = true;
        }
        match self.filters.first_mut() {
            Some(head) => head.send_frame(frame),
            None => {
                if let Some(frame) = frame {
                    self.passthrough.push_back(frame.clone());
                }
                Ok(())
            }
        }
    }

    /// 从链尾取出一帧
    pub fn receive_frame(&mut self) -> ReelResult<Frame> {
        if self.filters.is_empty() {
            return match self.passthrough.pop_front() {
                Some(frame) => Ok(frame),
                None if self.draining => Err(ReelError::Eof),
                None => Err(ReelError::NeedMoreData),
            };
        }
        self.pull(self.filters.len() - 1)
    }

    /// 从第 `index` 个滤镜取帧, 不足时先从上游补给
    fn pull(&mut self, index: usize) -> ReelResult<Frame> {
        loop {
            match self.filters[index].receive_frame() {
                Err(ReelError::NeedMoreData) if index > 0 => match self.pull(index - 1) {
                    Ok(frame) => self.filters[index].send_frame(Some(&frame))?,
                    Err(ReelError::Eof) => self.filters[index].send_frame(None)?,
                    Err(e) => return Err(e),
                },
                other => return other,
            }
        }
    }

    /// 丢弃所有滤镜的内部状态
    pub fn flush(&mut self) {
        for filter in &mut self.filters {
            filter.flush();
        }
        self.passthrough.clear();
        self.draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::null::NullFilter;
    use crate::filters::volume::VolumeFilter;
    use reel_codec::frame::AudioFrame;
    use reel_core::{ChannelLayout, Rational, SampleFormat};

    fn make_f32_frame(samples: &[f32], pts: i64) -> Frame {
        let mut af = AudioFrame::new(
            samples.len() as u32,
            44100,
            SampleFormat::F32,
            ChannelLayout::MONO,
        );
        af.data[0] = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        af.pts = pts;
        af.time_base = Rational::new(1, 44100);
        af.duration = samples.len() as i64;
        Frame::Audio(af)
    }

    fn extract_f32(frame: &Frame) -> Vec<f32> {
        let Frame::Audio(af) = frame else {
            panic!("期望音频帧");
        };
        af.data[0]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_filter_graph_debug() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(NullFilter::new()));
        graph.add_filter(Box::new(VolumeFilter::new(0.5)));
        let text = format!("{graph:?}");
        assert!(text.starts_with("FilterGraph"));
        assert!(text.contains(r#"["null", "volume"]"#), "{text}");
    }

    #[test]
    fn test_filter_graph_empty_passthrough() {
        let mut graph = FilterGraph::new();
        graph.send_frame(Some(&make_f32_frame(&[0.5], 0))).unwrap();
        graph.send_frame(Some(&make_f32_frame(&[-0.5], 1))).unwrap();
        assert_eq!(graph.receive_frame().unwrap().pts(), 0);
        assert_eq!(graph.receive_frame().unwrap().pts(), 1);
        assert!(matches!(graph.receive_frame(), Err(ReelError::NeedMoreData)));
        graph.send_frame(None).unwrap();
        assert!(matches!(graph.receive_frame(), Err(ReelError::Eof)));
        assert_eq!(graph.describe(), "(透传)");
    }

    #[test]
    fn test_filter_graph_chain() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(VolumeFilter::new(2.0)));
        graph.add_filter(Box::new(VolumeFilter::new(0.5)));
        graph.send_frame(Some(&make_f32_frame(&[0.3, -0.7], 7))).unwrap();
        let out = graph.receive_frame().unwrap();
        let samples = extract_f32(&out);
        assert!((samples[0] - 0.3).abs() < 1e-6);
        assert!((samples[1] + 0.7).abs() < 1e-6);
        assert_eq!(out.pts(), 7, "滤镜不改变时间戳");
        assert_eq!(graph.describe(), "volume,volume");
    }

    #[test]
    fn test_filter_graph_槽位满时要求先取帧() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(NullFilter::new()));
        graph.send_frame(Some(&make_f32_frame(&[0.1], 0))).unwrap();
        assert!(matches!(
            graph.send_frame(Some(&make_f32_frame(&[0.2], 1))),
            Err(ReelError::NeedMoreData)
        ));
        assert_eq!(graph.receive_frame().unwrap().pts(), 0);
        graph.send_frame(Some(&make_f32_frame(&[0.2], 1))).unwrap();
        assert_eq!(graph.receive_frame().unwrap().pts(), 1);
    }

    #[test]
    fn test_filter_graph_flush_propagates() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(NullFilter::new()));
        graph.add_filter(Box::new(VolumeFilter::new(1.0)));
        graph.add_filter(Box::new(NullFilter::new()));
        graph.send_frame(Some(&make_f32_frame(&[0.1], 3))).unwrap();
        assert_eq!(graph.receive_frame().unwrap().pts(), 3);
        assert!(matches!(graph.receive_frame(), Err(ReelError::NeedMoreData)));
        graph.send_frame(None).unwrap();
        assert!(matches!(graph.receive_frame(), Err(ReelError::Eof)));
        assert!(matches!(graph.receive_frame(), Err(ReelError::Eof)));
        assert!(graph.send_frame(Some(&make_f32_frame(&[0.1], 4))).is_err());
    }

    #[test]
    fn test_filter_graph_冲洗时仍可取出缓冲帧() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(NullFilter::new()));
        graph.add_filter(Box::new(NullFilter::new()));
        // 帧停留在第一个滤镜中时送入冲洗信号
        graph.send_frame(Some(&make_f32_frame(&[0.1], 10))).unwrap();
        graph.send_frame(None).unwrap();
        assert_eq!(graph.receive_frame().unwrap().pts(), 10);
        assert!(matches!(graph.receive_frame(), Err(ReelError::Eof)));
    }

    #[test]
    fn test_filter_graph_reset() {
        let mut graph = FilterGraph::new();
        graph.add_filter(Box::new(NullFilter::new()));
        graph.send_frame(Some(&make_f32_frame(&[0.1], 1))).unwrap();
        graph.send_frame(None).unwrap();
        graph.flush();
        assert!(matches!(graph.receive_frame(), Err(ReelError::NeedMoreData)));
        graph.send_frame(Some(&make_f32_frame(&[0.1], 2))).unwrap();
        assert_eq!(graph.receive_frame().unwrap().pts(), 2);
    }
}
