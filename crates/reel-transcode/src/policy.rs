//! 逐流转码策略.

use reel_core::MediaType;
use serde::{Deserialize, Serialize};

/// 转码策略
///
/// 可由命令行参数构建, 也可从 JSON 加载; 缺省字段取默认值.
///
/// ```rust
/// use reel_transcode::StreamPolicy;
///
/// let policy = StreamPolicy {
///     copy_video: true,
///     audio_encoder: Some("pcm_s16le".into()),
///     ..StreamPolicy::default()
/// };
/// assert!(policy.is_copy(reel_core::MediaType::Video));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPolicy {
    /// 视频流直接复制
    pub copy_video: bool,
    /// 音频流直接复制
    pub copy_audio: bool,
    /// 视频编码器名称, 缺省时沿用输入流的编解码器
    pub video_encoder: Option<String>,
    /// 音频编码器名称, 缺省时沿用输入流的编解码器
    pub audio_encoder: Option<String>,
    /// 以定长帧打开音频编码器 (每帧采样数)
    pub audio_frame_size: Option<u32>,
    /// 音频线性增益
    pub audio_volume: Option<f64>,
    /// 输出容器格式名, 缺省时按输出文件扩展名推断
    pub output_format: Option<String>,
}

impl StreamPolicy {
    /// 该媒体类型的流是否直接复制
    ///
    /// 音视频以外的流总是复制.
    pub fn is_copy(&self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Video => self.copy_video,
            MediaType::Audio => self.copy_audio,
            _ => true,
        }
    }

    /// 该媒体类型指定的编码器名称
    pub fn encoder_name(&self, media_type: MediaType) -> Option<&str> {
        match media_type {
            MediaType::Video => self.video_encoder.as_deref(),
            MediaType::Audio => self.audio_encoder.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_json_defaults() {
        let policy: StreamPolicy =
            serde_json::from_str(r#"{"copy_video": true, "audio_encoder": "pcm_f32le"}"#).unwrap();
        assert!(policy.copy_video);
        assert!(!policy.copy_audio);
        assert_eq!(policy.encoder_name(MediaType::Audio), Some("pcm_f32le"));
        assert_eq!(policy.encoder_name(MediaType::Video), None);
        assert_eq!(policy.audio_frame_size, None);
    }

    #[test]
    fn test_policy_非音视频流总是复制() {
        let policy = StreamPolicy::default();
        assert!(!policy.is_copy(MediaType::Audio));
        assert!(!policy.is_copy(MediaType::Video));
        assert!(policy.is_copy(MediaType::Subtitle));
        assert!(policy.is_copy(MediaType::Data));
    }

    #[test]
    fn test_policy_field_names() {
        let policy = StreamPolicy {
            audio_frame_size: Some(960),
            ..StreamPolicy::default()
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["audio_frame_size"], 960);
        assert_eq!(json["copy_audio"], false);
    }
}
