//! WAV -> WAV 转码任务测试 (真实文件, 内置 PCM 编解码器).

use reel::codec::{CodecId, Packet};
use reel::core::{ChannelLayout, MediaType, Rational, ReelError, SampleFormat};
use reel::format::{AudioStreamParams, FormatId, IoContext, Stream, StreamParams};
use reel::transcode::{RouteKind, StreamPolicy, run_job, run_job_with};

/// 生成立体声 s16 正弦波, 左右声道相反
fn sine_stereo(sample_rate: u32, nb_samples: usize) -> Vec<i16> {
    (0..nb_samples)
        .flat_map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            let v = ((t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 12000.0) as i16;
            [v, -v]
        })
        .collect()
}

fn write_wav(path: &str, samples: &[i16], sample_rate: u32) {
    let registry = reel::default_format_registry();
    let mut muxer = registry.create_muxer(FormatId::Wav).unwrap();
    let mut io = IoContext::open_write(path).unwrap();
    let stream = Stream {
        index: 0,
        media_type: MediaType::Audio,
        codec_id: CodecId::PcmS16le,
        time_base: Rational::new(1, sample_rate as i32),
        duration: -1,
        start_time: 0,
        extra_data: Vec::new(),
        params: StreamParams::Audio(AudioStreamParams {
            sample_rate,
            channel_layout: ChannelLayout::STEREO,
            sample_format: SampleFormat::S16,
            bit_rate: 0,
            frame_size: 0,
        }),
        metadata: Vec::new(),
    };
    muxer.write_header(&mut io, &[stream]).unwrap();
    let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    muxer.write_packet(&mut io, &Packet::from_data(data)).unwrap();
    muxer.write_trailer(&mut io).unwrap();
}

/// 读取 WAV 的编解码器, 声道数与全部数据
fn read_wav(path: &str) -> (CodecId, u32, Vec<u8>) {
    let registry = reel::default_format_registry();
    let mut io = IoContext::open_read(path).unwrap();
    let mut demuxer = registry.open_input(&mut io, Some(path)).unwrap();
    let stream = demuxer.streams()[0].clone();
    let channels = stream.audio().unwrap().channel_layout.channels;
    let mut data = Vec::new();
    loop {
        match demuxer.read_packet(&mut io) {
            Ok(packet) => data.extend_from_slice(&packet.data),
            Err(ReelError::Eof) => break,
            Err(e) => panic!("读取 {path} 失败: {e}"),
        }
    }
    (stream.codec_id, channels, data)
}

struct Paths {
    _dir: tempfile::TempDir,
    input: String,
    output: String,
}

fn paths(output_name: &str) -> Paths {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav").to_string_lossy().into_owned();
    let output = dir.path().join(output_name).to_string_lossy().into_owned();
    Paths {
        _dir: dir,
        input,
        output,
    }
}

#[test]
fn test_wav_fixed_frame_size_preserves_samples() {
    let _ = env_logger::builder().is_test(true).try_init();
    let p = paths("out.wav");
    // 10000 个采样会被解封装为 4096 + 4096 + 1808 三个数据包
    let samples = sine_stereo(44100, 10000);
    write_wav(&p.input, &samples, 44100);

    let policy = StreamPolicy {
        audio_frame_size: Some(1152),
        ..StreamPolicy::default()
    };
    let summary = run_job(&p.input, &p.output, &policy).unwrap();

    assert_eq!(summary.packets_read, 3);
    // 10000 = 8 x 1152 + 784
    assert_eq!(summary.packets_written, 9);
    assert_eq!(summary.bytes_written, 10000 * 4);
    let stats = summary.streams[0].stats.unwrap();
    assert_eq!(stats.samples_decoded, stats.samples_encoded);
    assert!(matches!(
        &summary.streams[0].route,
        RouteKind::Transcode { reframing: true, .. }
    ));

    let (codec_id, channels, data) = read_wav(&p.output);
    assert_eq!(codec_id, CodecId::PcmS16le);
    assert_eq!(channels, 2);
    let out: Vec<i16> = data
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(out, samples);
}

#[test]
fn test_wav_转为浮点并减半音量() {
    let p = paths("out.wav");
    let samples = sine_stereo(8000, 800);
    write_wav(&p.input, &samples, 8000);

    let policy = StreamPolicy {
        audio_encoder: Some("pcm_f32le".into()),
        audio_volume: Some(0.5),
        ..StreamPolicy::default()
    };
    let summary = run_job(&p.input, &p.output, &policy).unwrap();
    assert!(matches!(
        &summary.streams[0].route,
        RouteKind::Transcode { filters, .. } if filters == "aformat,volume"
    ));

    let (codec_id, channels, data) = read_wav(&p.output);
    assert_eq!(codec_id, CodecId::PcmF32le);
    assert_eq!(channels, 2);
    let out: Vec<f32> = data
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(out.len(), samples.len());
    for (o, s) in out.iter().zip(&samples) {
        let expected = f32::from(*s) / 32768.0 * 0.5;
        assert!((o - expected).abs() < 1e-6, "{o} != {expected}");
    }
}

#[test]
fn test_wav_output_format_from_policy() {
    let p = paths("out.bin");
    write_wav(&p.input, &sine_stereo(8000, 100), 8000);

    let err = run_job(&p.input, &p.output, &StreamPolicy::default()).unwrap_err();
    assert!(matches!(err, ReelError::FormatNotFound(_)));
    // 无法确定输出格式时不创建输出文件
    assert!(!std::path::Path::new(&p.output).exists());

    let policy = StreamPolicy {
        output_format: Some("wav".into()),
        ..StreamPolicy::default()
    };
    let codecs = reel::default_codec_registry();
    let formats = reel::default_format_registry();
    run_job_with(&codecs, &formats, &p.input, &p.output, &policy).unwrap();
    let (codec_id, _, data) = read_wav(&p.output);
    assert_eq!(codec_id, CodecId::PcmS16le);
    assert_eq!(data.len(), 100 * 4);
}

#[test]
fn test_wav_encoder_media_type_mismatch() {
    let p = paths("out.wav");
    write_wav(&p.input, &sine_stereo(8000, 100), 8000);

    let policy = StreamPolicy {
        audio_encoder: Some("rawvideo".into()),
        ..StreamPolicy::default()
    };
    let err = run_job(&p.input, &p.output, &policy).unwrap_err();
    assert!(matches!(err, ReelError::InvalidArgument(_)));
}
