//! 转码任务编排.
//!
//! 为每条输入流规划一条路线: 音视频流走转码管线, 其余流 (以及策略要求复制的流)
//! 只做时间戳换算后原样写出. 读循环把每个数据包交给对应路线; 输入结束后按流顺序
//! 冲洗全部管线, 最后写入文件尾. 任何错误都立即中止整个任务, 不写文件尾.

use std::fmt;

use log::{debug, error, info, warn};
use reel_codec::{
    AudioCodecParams, CodecParameters, CodecParamsType, CodecRegistry, Encoder, Packet,
    VideoCodecParams,
};
use reel_core::{MediaType, PixelFormat, Rational, ReelError, ReelResult};
use reel_filter::{AudioFormatSpec, VideoFormatSpec, build_audio_graph, build_video_graph};
use reel_format::{
    AudioStreamParams, Demuxer, FormatId, FormatRegistry, IoContext, Muxer, Stream, StreamParams,
    VideoStreamParams,
};

use crate::pipeline::{PacketSink, PipelineStats, PipelineTiming, StreamPipeline};
use crate::policy::StreamPolicy;

/// 把数据包写入封装器的 [`PacketSink`]
pub struct MuxerSink<'a> {
    muxer: &'a mut dyn Muxer,
    io: &'a mut IoContext,
    packets_written: u64,
    bytes_written: u64,
}

impl<'a> MuxerSink<'a> {
    pub fn new(muxer: &'a mut dyn Muxer, io: &'a mut IoContext) -> Self {
        Self {
            muxer,
            io,
            packets_written: 0,
            bytes_written: 0,
        }
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl PacketSink for MuxerSink<'_> {
    fn write_packet(&mut self, packet: Packet) -> ReelResult<()> {
        self.muxer.write_packet(self.io, &packet)?;
        self.packets_written += 1;
        self.bytes_written += packet.size() as u64;
        Ok(())
    }
}

/// 流复制路线
#[derive(Debug, Clone)]
pub struct CopyRoute {
    pub index: usize,
    pub input_time_base: Rational,
    pub output_time_base: Rational,
    pub packets: u64,
}

impl CopyRoute {
    fn forward(&mut self, mut packet: Packet, sink: &mut dyn PacketSink) -> ReelResult<()> {
        let from = if packet.time_base.is_valid() {
            packet.time_base
        } else {
            self.input_time_base
        };
        packet.stream_index = self.index;
        packet.rescale_ts(from, self.output_time_base);
        self.packets += 1;
        sink.write_packet(packet)
    }
}

/// 单条流的处理路线
pub enum StreamRoute {
    Transcode(Box<StreamPipeline>),
    Copy(CopyRoute),
}

impl StreamRoute {
    fn set_output_time_base(&mut self, time_base: Rational) {
        match self {
            Self::Transcode(pipeline) => pipeline.set_output_time_base(time_base),
            Self::Copy(copy) => copy.output_time_base = time_base,
        }
    }

    fn summary(&self, index: usize, media_type: MediaType) -> StreamSummary {
        match self {
            Self::Transcode(pipeline) => StreamSummary {
                index,
                media_type,
                route: RouteKind::Transcode {
                    decoder: pipeline.decoder_name().to_string(),
                    encoder: pipeline.encoder_name().to_string(),
                    filters: pipeline.filter_description(),
                    reframing: pipeline.is_reframing(),
                },
                stats: Some(pipeline.stats()),
                packets_copied: 0,
            },
            Self::Copy(copy) => StreamSummary {
                index,
                media_type,
                route: RouteKind::Copy,
                stats: None,
                packets_copied: copy.packets,
            },
        }
    }
}

/// 路线种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    Transcode {
        decoder: String,
        encoder: String,
        /// 滤镜链描述
        filters: String,
        reframing: bool,
    },
    Copy,
}

/// 单条流的处理结果
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub index: usize,
    pub media_type: MediaType,
    pub route: RouteKind,
    /// 转码路线的计数
    pub stats: Option<PipelineStats>,
    /// 复制路线写出的数据包数
    pub packets_copied: u64,
}

/// 转码任务结果
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub streams: Vec<StreamSummary>,
    pub packets_read: u64,
    /// 属于未知流而被丢弃的数据包
    pub packets_dropped: u64,
    pub packets_written: u64,
    pub bytes_written: u64,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.streams {
            match &s.route {
                RouteKind::Transcode {
                    decoder,
                    encoder,
                    filters,
                    reframing,
                } => {
                    write!(
                        f,
                        "  流 #{} ({}): {} -> [{}] -> {}{}",
                        s.index,
                        s.media_type,
                        decoder,
                        filters,
                        encoder,
                        if *reframing { " (重组)" } else { "" }
                    )?;
                    if let Some(stats) = &s.stats {
                        write!(
                            f,
                            ", 解码 {} 帧, 编码 {} 帧, 写出 {} 个数据包",
                            stats.frames_decoded, stats.frames_encoded, stats.packets_out
                        )?;
                    }
                    writeln!(f)?;
                }
                RouteKind::Copy => writeln!(
                    f,
                    "  流 #{} ({}): 复制 {} 个数据包",
                    s.index, s.media_type, s.packets_copied
                )?,
            }
        }
        write!(
            f,
            "读取 {} 个数据包, 写出 {} 个数据包 ({} 字节)",
            self.packets_read, self.packets_written, self.bytes_written
        )
    }
}

/// 转码任务编排器
pub struct Transcoder<'a> {
    codecs: &'a CodecRegistry,
    policy: StreamPolicy,
}

impl<'a> Transcoder<'a> {
    pub fn new(codecs: &'a CodecRegistry, policy: StreamPolicy) -> Self {
        Self { codecs, policy }
    }

    pub fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    /// 为每条输入流规划路线, 同时给出输出流描述 (输出流索引与输入流索引相同)
    pub fn plan(&self, streams: &[Stream]) -> ReelResult<(Vec<StreamRoute>, Vec<Stream>)> {
        if streams.is_empty() {
            return Err(ReelError::InvalidData("输入中没有任何流".into()));
        }
        let mut routes = Vec::with_capacity(streams.len());
        let mut outputs = Vec::with_capacity(streams.len());
        for (index, stream) in streams.iter().enumerate() {
            let (route, out_stream) = if self.policy.is_copy(stream.media_type) {
                debug!("流 #{index} ({}) 直接复制", stream.media_type);
                let copy = CopyRoute {
                    index,
                    input_time_base: stream.time_base,
                    output_time_base: stream.time_base,
                    packets: 0,
                };
                let out_stream = Stream {
                    index,
                    ..stream.clone()
                };
                (StreamRoute::Copy(copy), out_stream)
            } else {
                let (pipeline, out_stream) = self.build_pipeline(index, stream)?;
                (StreamRoute::Transcode(Box::new(pipeline)), out_stream)
            };
            routes.push(route);
            outputs.push(out_stream);
        }
        Ok((routes, outputs))
    }

    fn create_encoder(&self, stream: &Stream) -> ReelResult<Box<dyn Encoder>> {
        let encoder = match self.policy.encoder_name(stream.media_type) {
            Some(name) => self.codecs.create_encoder_by_name(name)?,
            None => self.codecs.create_encoder(stream.codec_id)?,
        };
        let encoder_type = encoder.codec_id().media_type();
        if encoder_type != stream.media_type {
            return Err(ReelError::InvalidArgument(format!(
                "编码器 {} 用于{}, 不能编码{}流 #{}",
                encoder.name(),
                encoder_type,
                stream.media_type,
                stream.index
            )));
        }
        Ok(encoder)
    }

    fn build_pipeline(&self, index: usize, stream: &Stream) -> ReelResult<(StreamPipeline, Stream)> {
        match stream.media_type {
            MediaType::Audio => self.build_audio_pipeline(index, stream),
            MediaType::Video => self.build_video_pipeline(index, stream),
            other => Err(ReelError::Unsupported(format!("{other}流不能转码"))),
        }
    }

    fn build_audio_pipeline(
        &self,
        index: usize,
        stream: &Stream,
    ) -> ReelResult<(StreamPipeline, Stream)> {
        let audio = stream
            .audio()
            .ok_or_else(|| ReelError::InvalidArgument(format!("流 #{index} 缺少音频参数")))?;
        let sample_rate = i32::try_from(audio.sample_rate)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| {
                ReelError::InvalidArgument(format!("流 #{index} 采样率无效: {}", audio.sample_rate))
            })?;

        let mut decoder = self.codecs.create_decoder(stream.codec_id)?;
        decoder.open(&stream.codec_parameters())?;

        let mut encoder = self.create_encoder(stream)?;
        let sample_format = encoder
            .preferred_sample_format()
            .unwrap_or(audio.sample_format);
        encoder.open(&CodecParameters {
            codec_id: encoder.codec_id(),
            extra_data: Vec::new(),
            bit_rate: audio.bit_rate,
            params: CodecParamsType::Audio(AudioCodecParams {
                sample_rate: audio.sample_rate,
                channel_layout: audio.channel_layout,
                sample_format,
                frame_size: self.policy.audio_frame_size.unwrap_or(0),
            }),
        })?;
        let sample_format = encoder.preferred_sample_format().unwrap_or(sample_format);

        let input_spec = AudioFormatSpec {
            sample_rate: audio.sample_rate,
            sample_format: audio.sample_format,
            channel_layout: audio.channel_layout,
        };
        let output_spec = AudioFormatSpec {
            sample_format,
            ..input_spec
        };
        let filter = build_audio_graph(&input_spec, &output_spec, self.policy.audio_volume)?;

        let working = Rational::new(1, sample_rate);
        let out_stream = Stream {
            index,
            media_type: MediaType::Audio,
            codec_id: encoder.codec_id(),
            time_base: working,
            duration: 0,
            start_time: 0,
            extra_data: Vec::new(),
            params: StreamParams::Audio(AudioStreamParams {
                sample_rate: audio.sample_rate,
                channel_layout: audio.channel_layout,
                sample_format,
                bit_rate: audio.bit_rate,
                frame_size: encoder.frame_size(),
            }),
            metadata: stream.metadata.clone(),
        };
        let timing = PipelineTiming {
            output_index: index,
            input_time_base: stream.time_base,
            working_time_base: working,
            output_time_base: working,
        };
        let pipeline = StreamPipeline::new(
            MediaType::Audio,
            timing,
            decoder,
            filter,
            encoder,
            audio.frame_size,
        )?;
        Ok((pipeline, out_stream))
    }

    fn build_video_pipeline(
        &self,
        index: usize,
        stream: &Stream,
    ) -> ReelResult<(StreamPipeline, Stream)> {
        let video = stream
            .video()
            .ok_or_else(|| ReelError::InvalidArgument(format!("流 #{index} 缺少视频参数")))?;

        let mut decoder = self.codecs.create_decoder(stream.codec_id)?;
        decoder.open(&stream.codec_parameters())?;

        let mut encoder = self.create_encoder(stream)?;
        let pixel_format = encoder
            .preferred_pixel_format()
            .unwrap_or(video.pixel_format);
        encoder.open(&CodecParameters {
            codec_id: encoder.codec_id(),
            extra_data: Vec::new(),
            bit_rate: video.bit_rate,
            params: CodecParamsType::Video(VideoCodecParams {
                width: video.width,
                height: video.height,
                pixel_format,
                frame_rate: video.frame_rate,
            }),
        })?;
        let required = encoder.preferred_pixel_format().unwrap_or(PixelFormat::None);

        let input_spec = VideoFormatSpec {
            width: video.width,
            height: video.height,
            pixel_format: video.pixel_format,
        };
        let output_spec = VideoFormatSpec {
            pixel_format: required,
            ..input_spec
        };
        let filter = build_video_graph(&input_spec, &output_spec)?;

        let working = if video.frame_rate.is_valid() {
            video.frame_rate.invert()
        } else {
            stream.time_base
        };
        let out_stream = Stream {
            index,
            media_type: MediaType::Video,
            codec_id: encoder.codec_id(),
            time_base: working,
            duration: 0,
            start_time: 0,
            extra_data: Vec::new(),
            params: StreamParams::Video(VideoStreamParams {
                width: video.width,
                height: video.height,
                pixel_format: if required == PixelFormat::None {
                    video.pixel_format
                } else {
                    required
                },
                frame_rate: video.frame_rate,
                bit_rate: video.bit_rate,
            }),
            metadata: stream.metadata.clone(),
        };
        let timing = PipelineTiming {
            output_index: index,
            input_time_base: stream.time_base,
            working_time_base: working,
            output_time_base: working,
        };
        let pipeline =
            StreamPipeline::new(MediaType::Video, timing, decoder, filter, encoder, 0)?;
        Ok((pipeline, out_stream))
    }

    /// 执行转码任务
    ///
    /// 顺序: 写头部, 采用封装器选定的时间基, 读循环, 按流顺序冲洗, 写文件尾.
    /// 出错时立即返回, 已写出的内容保留但没有文件尾, 输出不保证有效.
    pub fn run(
        &self,
        demuxer: &mut dyn Demuxer,
        input: &mut IoContext,
        muxer: &mut dyn Muxer,
        output: &mut IoContext,
    ) -> ReelResult<JobSummary> {
        let result = self.execute(demuxer, input, muxer, output);
        if let Err(e) = &result {
            error!("转码中止, 未写入文件尾: {e}");
        }
        result
    }

    fn execute(
        &self,
        demuxer: &mut dyn Demuxer,
        input: &mut IoContext,
        muxer: &mut dyn Muxer,
        output: &mut IoContext,
    ) -> ReelResult<JobSummary> {
        let media_types: Vec<MediaType> = demuxer.streams().iter().map(|s| s.media_type).collect();
        let (mut routes, mut out_streams) = self.plan(demuxer.streams())?;
        info!(
            "开始转码: {} -> {}, {} 条流",
            demuxer.name(),
            muxer.name(),
            routes.len()
        );

        muxer.write_header(output, &out_streams)?;
        for (index, route) in routes.iter_mut().enumerate() {
            if let Some(tb) = muxer.stream_time_base(index).filter(Rational::is_valid) {
                if tb != out_streams[index].time_base {
                    debug!("流 #{index} 采用封装器选定的时间基 {tb}");
                }
                route.set_output_time_base(tb);
                out_streams[index].time_base = tb;
            }
        }

        let mut packets_read = 0u64;
        let mut packets_dropped = 0u64;
        let mut sink = MuxerSink::new(&mut *muxer, &mut *output);
        loop {
            let packet = match demuxer.read_packet(input) {
                Ok(packet) => packet,
                Err(ReelError::Eof) => break,
                Err(e) => return Err(e),
            };
            packets_read += 1;
            match routes.get_mut(packet.stream_index) {
                Some(StreamRoute::Transcode(pipeline)) => {
                    pipeline.process_packet(&packet, &mut sink)?
                }
                Some(StreamRoute::Copy(copy)) => copy.forward(packet, &mut sink)?,
                None => {
                    packets_dropped += 1;
                    warn!("数据包属于未知的流 #{}, 已丢弃", packet.stream_index);
                }
            }
        }

        info!("输入结束, 共读取 {packets_read} 个数据包, 冲洗全部管线");
        for route in &mut routes {
            if let StreamRoute::Transcode(pipeline) = route {
                pipeline.drain(&mut sink)?;
            }
        }
        let packets_written = sink.packets_written();
        let bytes_written = sink.bytes_written();

        muxer.write_trailer(output)?;

        let summary = JobSummary {
            streams: routes
                .iter()
                .zip(media_types)
                .enumerate()
                .map(|(index, (route, media_type))| route.summary(index, media_type))
                .collect(),
            packets_read,
            packets_dropped,
            packets_written,
            bytes_written,
        };
        info!(
            "转码完成: 写出 {} 个数据包, {} 字节",
            summary.packets_written, summary.bytes_written
        );
        Ok(summary)
    }
}

/// 确定输出容器: 策略中的格式名优先, 否则按文件扩展名推断
pub fn output_format_for(output_path: &str, policy: &StreamPolicy) -> ReelResult<FormatId> {
    match &policy.output_format {
        Some(name) => FormatId::from_name(name)
            .ok_or_else(|| ReelError::FormatNotFound(format!("未知的输出格式: {name}"))),
        None => FormatId::from_filename(output_path).ok_or_else(|| {
            ReelError::FormatNotFound(format!("无法从文件名推断输出格式: {output_path}"))
        }),
    }
}

/// 使用内置编解码器与容器执行转码任务
pub fn run_job(
    input_path: &str,
    output_path: &str,
    policy: &StreamPolicy,
) -> ReelResult<JobSummary> {
    let codecs = CodecRegistry::with_builtin();
    let formats = FormatRegistry::with_builtin();
    run_job_with(&codecs, &formats, input_path, output_path, policy)
}

/// 使用给定注册表执行转码任务
pub fn run_job_with(
    codecs: &CodecRegistry,
    formats: &FormatRegistry,
    input_path: &str,
    output_path: &str,
    policy: &StreamPolicy,
) -> ReelResult<JobSummary> {
    let format_id = output_format_for(output_path, policy)?;
    let mut input = IoContext::open_read(input_path)?;
    let mut demuxer = formats.open_input(&mut input, Some(input_path))?;
    let mut muxer = formats.create_muxer(format_id)?;
    let mut output = IoContext::open_write(output_path)?;
    info!("{input_path} -> {output_path} ({format_id})");
    Transcoder::new(codecs, policy.clone()).run(
        demuxer.as_mut(),
        &mut input,
        muxer.as_mut(),
        &mut output,
    )
}
