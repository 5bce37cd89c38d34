//! 采样值的归一化读写.
//!
//! 所有整型采样先映射到 [-1.0, 1.0) 的 f64, 运算后再量化回目标格式.

use reel_codec::frame::AudioFrame;
use reel_core::{ReelError, ReelResult, SampleFormat};

const S16_SCALE: f64 = 32768.0;
const S32_SCALE: f64 = 2_147_483_648.0;

/// 解码单个采样, `bytes` 长度必须等于 `format.bytes_per_sample()`
pub(crate) fn read_sample(bytes: &[u8], format: SampleFormat) -> f64 {
    match format.to_interleaved() {
        SampleFormat::U8 => (f64::from(bytes[0]) - 128.0) / 128.0,
        SampleFormat::S16 => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])) / S16_SCALE,
        SampleFormat::S32 => {
            f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])) / S32_SCALE
        }
        SampleFormat::F32 => f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        SampleFormat::F64 => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        _ => 0.0,
    }
}

/// 量化单个采样并追加到 `out`, 整型格式四舍五入并截断到取值范围
pub(crate) fn write_sample(value: f64, format: SampleFormat, out: &mut Vec<u8>) {
    match format.to_interleaved() {
        SampleFormat::U8 => {
            let v = (value * 128.0 + 128.0).round().clamp(0.0, 255.0);
            out.push(v as u8);
        }
        SampleFormat::S16 => {
            let v = (value * S16_SCALE).round().clamp(-S16_SCALE, S16_SCALE - 1.0);
            out.extend_from_slice(&(v as i16).to_le_bytes());
        }
        SampleFormat::S32 => {
            let v = (value * S32_SCALE).round().clamp(-S32_SCALE, S32_SCALE - 1.0);
            out.extend_from_slice(&(v as i32).to_le_bytes());
        }
        SampleFormat::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
        SampleFormat::F64 => out.extend_from_slice(&value.to_le_bytes()),
        _ => {}
    }
}

/// 检查帧的格式与数据长度
pub(crate) fn validate(frame: &AudioFrame) -> ReelResult<()> {
    if frame.sample_format.bytes_per_sample() == 0 {
        return Err(ReelError::Unsupported(format!(
            "不支持的采样格式: {}",
            frame.sample_format
        )));
    }
    let channels = frame.channel_layout.channels;
    if channels == 0 {
        return Err(ReelError::InvalidArgument("声道数不能为 0".into()));
    }
    let expected_planes = frame.sample_format.plane_count(channels);
    if frame.data.len() != expected_planes {
        return Err(ReelError::InvalidData(format!(
            "音频帧应有 {} 个平面, 实际 {}",
            expected_planes,
            frame.data.len()
        )));
    }
    let plane_size = frame.plane_size();
    if let Some(short) = frame.data.iter().find(|p| p.len() < plane_size) {
        return Err(ReelError::InvalidData(format!(
            "音频平面数据不足: 需要 {} 字节, 实际 {}",
            plane_size,
            short.len()
        )));
    }
    Ok(())
}

/// 将帧解码为交错排列的 f64 采样 (`nb_samples * channels` 个)
pub(crate) fn to_f64(frame: &AudioFrame) -> ReelResult<Vec<f64>> {
    validate(frame)?;
    let format = frame.sample_format;
    let bps = format.bytes_per_sample() as usize;
    let channels = frame.channel_layout.channels as usize;
    let nb_samples = frame.nb_samples as usize;

    let mut out = Vec::with_capacity(nb_samples * channels);
    if format.is_planar() {
        for i in 0..nb_samples {
            for plane in &frame.data {
                out.push(read_sample(&plane[i * bps..(i + 1) * bps], format));
            }
        }
    } else {
        out.extend(
            frame.data[0]
                .chunks_exact(bps)
                .take(nb_samples * channels)
                .map(|c| read_sample(c, format)),
        );
    }
    Ok(out)
}

/// 将交错排列的 f64 采样编码为目标格式的平面数据
pub(crate) fn from_f64(samples: &[f64], channels: u32, format: SampleFormat) -> Vec<Vec<u8>> {
    let channels = channels as usize;
    let bps = format.bytes_per_sample() as usize;
    if format.is_planar() {
        let per_plane = samples.len() / channels.max(1);
        (0..channels)
            .map(|ch| {
                let mut plane = Vec::with_capacity(per_plane * bps);
                for v in samples.iter().skip(ch).step_by(channels) {
                    write_sample(*v, format, &mut plane);
                }
                plane
            })
            .collect()
    } else {
        let mut plane = Vec::with_capacity(samples.len() * bps);
        for v in samples {
            write_sample(*v, format, &mut plane);
        }
        vec![plane]
    }
}

/// 声道数转换
///
/// - 单声道 -> 多声道: 复制到每个声道
/// - 多声道 -> 单声道: 取平均
/// - 其他: 按序映射, 多余声道丢弃, 缺少的声道补零
pub(crate) fn mix_channels(samples: &[f64], in_channels: usize, out_channels: usize) -> Vec<f64> {
    if in_channels == out_channels || in_channels == 0 {
        return samples.to_vec();
    }
    let nb_samples = samples.len() / in_channels;
    let mut out = Vec::with_capacity(nb_samples * out_channels);
    for frame in samples.chunks_exact(in_channels) {
        if in_channels == 1 {
            out.extend(std::iter::repeat_n(frame[0], out_channels));
        } else if out_channels == 1 {
            out.push(frame.iter().sum::<f64>() / in_channels as f64);
        } else {
            out.extend((0..out_channels).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_normalization() {
        assert_eq!(read_sample(&[128], SampleFormat::U8), 0.0);
        assert_eq!(read_sample(&16384i16.to_le_bytes(), SampleFormat::S16), 0.5);
        assert_eq!(read_sample(&i32::MIN.to_le_bytes(), SampleFormat::S32p), -1.0);
    }

    #[test]
    fn test_quantize_clamps() {
        let mut out = Vec::new();
        write_sample(1.5, SampleFormat::S16, &mut out);
        write_sample(-2.0, SampleFormat::S16, &mut out);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), i16::MIN);

        let mut out = Vec::new();
        write_sample(0.999, SampleFormat::U8, &mut out);
        assert_eq!(out, vec![255]);
    }

    #[test]
    fn test_mono_to_stereo() {
        assert_eq!(mix_channels(&[0.25, -0.5], 1, 2), vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn test_stereo_downmix() {
        let mono = mix_channels(&[0.2, 0.4, -1.0, 0.0], 2, 1);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-12);
        assert!((mono[1] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_channel_map_多声道按序映射并补零() {
        let six: Vec<f64> = (0..6).map(f64::from).collect();
        assert_eq!(mix_channels(&six, 6, 2), vec![0.0, 1.0]);
        assert_eq!(mix_channels(&[1.0, 2.0], 2, 3), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_planar_split() {
        let planes = from_f64(&[0.5, -0.5, 0.25, -0.25], 2, SampleFormat::F32p);
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].len(), 8);
        assert_eq!(f32::from_le_bytes(planes[1][4..8].try_into().unwrap()), -0.25);
    }
}
