//! 音量调节滤镜.
//!
//! 对标 FFmpeg 的 `volume` 滤镜, 支持线性倍数和 dB 两种方式指定增益.

use reel_codec::frame::{AudioFrame, Frame};
use reel_core::{ReelError, ReelResult};

use crate::sample;
use crate::{Filter, FrameSlot};

/// 音量调节滤镜
#[derive(Debug)]
pub struct VolumeFilter {
    /// 增益系数 (线性, 1.0 = 不变)
    gain: f64,
    slot: FrameSlot,
}

impl VolumeFilter {
    /// 使用线性增益创建 (1.0 = 不变, 2.0 = 加倍, 0.5 = 减半)
    pub fn new(gain: f64) -> Self {
        Self {
            gain,
            slot: FrameSlot::default(),
        }
    }

    /// 使用 dB 增益创建 (0 = 不变, 6 约 加倍, -6 约 减半)
    pub fn from_db(db: f64) -> Self {
        Self::new(10.0_f64.powf(db / 20.0))
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// 逐平面应用增益, 整型格式饱和截断
    fn apply_gain(&self, frame: &AudioFrame) -> ReelResult<AudioFrame> {
        sample::validate(frame)?;
        let format = frame.sample_format;
        let bps = format.bytes_per_sample() as usize;
        let plane_size = frame.plane_size();

        let data = frame
            .data
            .iter()
            .map(|plane| {
                let mut out = Vec::with_capacity(plane_size);
                for chunk in plane[..plane_size].chunks_exact(bps) {
                    let value = sample::read_sample(chunk, format) * self.gain;
                    sample::write_sample(value, format, &mut out);
                }
                out
            })
            .collect();

        Ok(AudioFrame {
            data,
            nb_samples: frame.nb_samples,
            sample_rate: frame.sample_rate,
            sample_format: format,
            channel_layout: frame.channel_layout,
            pts: frame.pts,
            time_base: frame.time_base,
            duration: frame.duration,
        })
    }
}

impl Filter for VolumeFilter {
    fn name(&self) -> &str {
        "volume"
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()> {
        match frame {
            None => {
                self.slot.start_draining();
                Ok(())
            }
            Some(Frame::Audio(af)) => {
                if self.slot.is_full() {
                    return Err(ReelError::NeedMoreData);
                }
                let result = self.apply_gain(af)?;
                self.slot.put(Frame::Audio(result))
            }
            Some(Frame::Video(_)) => {
                Err(ReelError::InvalidArgument("volume 滤镜仅支持音频帧".into()))
            }
        }
    }

    fn receive_frame(&mut self) -> ReelResult<Frame> {
        self.slot.take()
    }

    fn flush(&mut self) {
        self.slot.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_codec::frame::VideoFrame;
    use reel_core::{ChannelLayout, PixelFormat, SampleFormat};

    fn make_frame(format: SampleFormat, data: Vec<Vec<u8>>, nb_samples: u32) -> Frame {
        let mut af = AudioFrame::new(nb_samples, 44100, format, ChannelLayout::MONO);
        af.data = data;
        Frame::Audio(af)
    }

    fn output_plane(filter: &mut VolumeFilter) -> Vec<u8> {
        match filter.receive_frame().unwrap() {
            Frame::Audio(af) => af.data.into_iter().next().unwrap(),
            Frame::Video(_) => panic!("期望音频帧"),
        }
    }

    #[test]
    fn test_volume_f32_double() {
        let mut filter = VolumeFilter::new(2.0);
        let input: Vec<u8> = [0.25f32, -0.25].iter().flat_map(|s| s.to_le_bytes()).collect();
        filter
            .send_frame(Some(&make_frame(SampleFormat::F32, vec![input], 2)))
            .unwrap();
        let plane = output_plane(&mut filter);
        assert_eq!(f32::from_le_bytes([plane[0], plane[1], plane[2], plane[3]]), 0.5);
        assert_eq!(f32::from_le_bytes([plane[4], plane[5], plane[6], plane[7]]), -0.5);
    }

    #[test]
    fn test_volume_s16_clipping() {
        let mut filter = VolumeFilter::new(4.0);
        let input: Vec<u8> = [20000i16, -1000].iter().flat_map(|s| s.to_le_bytes()).collect();
        filter
            .send_frame(Some(&make_frame(SampleFormat::S16, vec![input], 2)))
            .unwrap();
        let plane = output_plane(&mut filter);
        assert_eq!(i16::from_le_bytes([plane[0], plane[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([plane[2], plane[3]]), -4000);
    }

    #[test]
    fn test_volume_u8_以中点为零() {
        let mut filter = VolumeFilter::new(0.5);
        filter
            .send_frame(Some(&make_frame(SampleFormat::U8, vec![vec![128, 192, 64]], 3)))
            .unwrap();
        assert_eq!(output_plane(&mut filter), vec![128, 160, 96]);
    }

    #[test]
    fn test_volume_db_gain() {
        let filter = VolumeFilter::from_db(-6.0);
        assert!((filter.gain() - 0.501).abs() < 0.001);
    }

    #[test]
    fn test_volume_rejects_video() {
        let mut filter = VolumeFilter::new(1.0);
        let vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        assert!(filter.send_frame(Some(&Frame::Video(vf))).is_err());
    }
}
