//! 滤镜图构建: 根据解码端与编码端的格式描述生成归一化滤镜链.

use log::debug;
use reel_core::{ChannelLayout, PixelFormat, ReelError, ReelResult, SampleFormat};

use crate::FilterGraph;
use crate::filters::aformat::AformatFilter;
use crate::filters::format::FormatFilter;
use crate::filters::null::NullFilter;
use crate::filters::volume::VolumeFilter;

/// 音频格式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatSpec {
    pub sample_rate: u32,
    /// `SampleFormat::None` 表示沿用输入格式
    pub sample_format: SampleFormat,
    pub channel_layout: ChannelLayout,
}

/// 视频格式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormatSpec {
    pub width: u32,
    pub height: u32,
    /// `PixelFormat::None` 表示不限制
    pub pixel_format: PixelFormat,
}

/// 构建音频滤镜链
///
/// - 采样率不同: `Unsupported` (不做重采样)
/// - 格式或声道数不同: 插入 aformat
/// - 指定了非 1.0 的增益: 追加 volume
/// - 无需任何处理: 单个 null 滤镜
pub fn build_audio_graph(
    input: &AudioFormatSpec,
    output: &AudioFormatSpec,
    volume: Option<f64>,
) -> ReelResult<FilterGraph> {
    if input.sample_rate != 0 && output.sample_rate != 0 && input.sample_rate != output.sample_rate
    {
        return Err(ReelError::Unsupported(format!(
            "不支持采样率转换: {} Hz -> {} Hz",
            input.sample_rate, output.sample_rate
        )));
    }
    if let Some(gain) = volume {
        if !gain.is_finite() || gain < 0.0 {
            return Err(ReelError::InvalidArgument(format!("无效的音量增益: {gain}")));
        }
    }

    let target_format = match output.sample_format {
        SampleFormat::None => input.sample_format,
        other => other,
    };
    let target_layout = if output.channel_layout.channels == 0 {
        input.channel_layout
    } else {
        output.channel_layout
    };

    let mut graph = FilterGraph::new();
    if target_format != input.sample_format || target_layout != input.channel_layout {
        let mut aformat = AformatFilter::new(target_format, target_layout);
        if input.sample_rate != 0 {
            aformat = aformat.with_sample_rate(input.sample_rate);
        }
        graph.add_filter(Box::new(aformat));
    }
    if let Some(gain) = volume.filter(|g| (*g - 1.0).abs() > f64::EPSILON) {
        graph.add_filter(Box::new(VolumeFilter::new(gain)));
    }
    if graph.filter_count() == 0 {
        graph.add_filter(Box::new(NullFilter::new()));
    }

    debug!(
        "音频滤镜链: {} {} {} Hz -> {} {}: {}",
        input.sample_format,
        input.channel_layout,
        input.sample_rate,
        target_format,
        target_layout,
        graph.describe()
    );
    Ok(graph)
}

/// 构建视频滤镜链
///
/// 编码器要求像素格式时插入 format 校验, 否则为 null.
pub fn build_video_graph(
    input: &VideoFormatSpec,
    output: &VideoFormatSpec,
) -> ReelResult<FilterGraph> {
    let mut graph = FilterGraph::new();
    if output.pixel_format == PixelFormat::None {
        graph.add_filter(Box::new(NullFilter::new()));
    } else {
        let width = if output.width == 0 { input.width } else { output.width };
        let height = if output.height == 0 { input.height } else { output.height };
        graph.add_filter(Box::new(
            FormatFilter::new(output.pixel_format).with_size(width, height),
        ));
    }
    debug!(
        "视频滤镜链: {}x{} {} -> {}: {}",
        input.width,
        input.height,
        input.pixel_format,
        output.pixel_format,
        graph.describe()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(sample_rate: u32, sample_format: SampleFormat, channels: u32) -> AudioFormatSpec {
        AudioFormatSpec {
            sample_rate,
            sample_format,
            channel_layout: ChannelLayout::from_channels(channels),
        }
    }

    #[test]
    fn test_audio_graph_null_when_matching() {
        let spec = audio(48000, SampleFormat::S16, 2);
        let graph = build_audio_graph(&spec, &spec, None).unwrap();
        assert_eq!(graph.filter_names(), vec!["null"]);
    }

    #[test]
    fn test_audio_graph_aformat_and_volume() {
        let graph = build_audio_graph(
            &audio(48000, SampleFormat::S16, 2),
            &audio(48000, SampleFormat::F32p, 1),
            Some(0.5),
        )
        .unwrap();
        assert_eq!(graph.filter_names(), vec!["aformat", "volume"]);
    }

    #[test]
    fn test_audio_graph_未指定目标格式时沿用输入() {
        let graph = build_audio_graph(
            &audio(44100, SampleFormat::S16, 2),
            &audio(44100, SampleFormat::None, 0),
            Some(1.0),
        )
        .unwrap();
        assert_eq!(graph.filter_names(), vec!["null"]);
    }

    #[test]
    fn test_audio_graph_rejects_rate_change() {
        let err = build_audio_graph(
            &audio(44100, SampleFormat::S16, 2),
            &audio(48000, SampleFormat::S16, 2),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::Unsupported(_)));
    }

    #[test]
    fn test_audio_graph_rejects_negative_gain() {
        let spec = audio(48000, SampleFormat::S16, 2);
        assert!(build_audio_graph(&spec, &spec, Some(-1.0)).is_err());
    }

    #[test]
    fn test_video_graph_按编码器像素格式选择滤镜() {
        let input = VideoFormatSpec {
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Yuv420p,
        };
        let any = VideoFormatSpec {
            pixel_format: PixelFormat::None,
            ..input
        };
        assert_eq!(build_video_graph(&input, &any).unwrap().filter_names(), vec!["null"]);
        assert_eq!(
            build_video_graph(&input, &input).unwrap().filter_names(),
            vec!["format"]
        );
    }
}
