//! reel - 逐流转码命令行工具
//!
//! 读取输入容器, 按策略对每条流转码或直接复制, 写出到输出容器.

mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use reel_codec::CodecRegistry;
use reel_format::FormatRegistry;
use reel_transcode::{StreamPolicy, run_job_with};

#[derive(Parser, Debug)]
#[command(name = "reel", version, about = "纯 Rust 逐流转码工具")]
struct Cli {
    /// 输入文件路径
    #[arg(short, long)]
    input: Option<String>,

    /// 输出文件路径
    #[arg(short, long)]
    output: Option<String>,

    /// 音频编码器 ("copy" 表示直接复制, 或编码器名如 "pcm_s16le")
    #[arg(short = 'c', long = "acodec")]
    acodec: Option<String>,

    /// 视频编码器 ("copy" 表示直接复制, 或编码器名如 "rawvideo")
    #[arg(long = "vcodec")]
    vcodec: Option<String>,

    /// 音频编码器帧长 (每帧采样数)
    #[arg(long = "frame-size")]
    frame_size: Option<u32>,

    /// 音频线性增益 (如 0.5)
    #[arg(long)]
    volume: Option<f64>,

    /// 输出容器格式, 缺省按输出文件扩展名推断
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// JSON 策略文件, 命令行参数优先于文件
    #[arg(long)]
    policy: Option<String>,

    /// 覆盖输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 列出已注册的编解码器与容器格式
    #[arg(long)]
    list: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init("reel-cli", cli.verbose) {
        eprintln!("警告: {e:#}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("错误: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let codecs = CodecRegistry::with_builtin();
    let formats = FormatRegistry::with_builtin();

    if cli.list {
        print_registries(&codecs, &formats);
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        print_banner();
        return Ok(());
    };
    let output = cli
        .output
        .as_deref()
        .context("必须指定输出文件 (-o <输出文件>)")?;
    if !cli.overwrite && Path::new(output).exists() {
        bail!("输出文件已存在 '{output}', 使用 -y 覆盖");
    }

    let policy = build_policy(cli)?;
    eprintln!(
        "reel 版本 {} -- 纯 Rust 逐流转码工具",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("输入: {input}");
    eprintln!("输出: {output}");
    info!("转码策略: {policy:?}");

    let summary = run_job_with(&codecs, &formats, input, output, &policy)
        .with_context(|| format!("转码 '{input}' 失败"))?;
    eprintln!("{summary}");
    Ok(())
}

/// 由策略文件与命令行参数构建转码策略
fn build_policy(cli: &Cli) -> Result<StreamPolicy> {
    let mut policy = match &cli.policy {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("读取策略文件 '{path}' 失败"))?;
            serde_json::from_str(&text).with_context(|| format!("解析策略文件 '{path}' 失败"))?
        }
        None => StreamPolicy::default(),
    };

    apply_codec_flag(
        cli.acodec.as_deref(),
        &mut policy.copy_audio,
        &mut policy.audio_encoder,
    );
    apply_codec_flag(
        cli.vcodec.as_deref(),
        &mut policy.copy_video,
        &mut policy.video_encoder,
    );
    if let Some(frame_size) = cli.frame_size {
        if frame_size == 0 {
            bail!("--frame-size 必须大于 0");
        }
        policy.audio_frame_size = Some(frame_size);
    }
    if let Some(volume) = cli.volume {
        policy.audio_volume = Some(volume);
    }
    if let Some(format) = &cli.format {
        policy.output_format = Some(format.clone());
    }
    Ok(policy)
}

fn apply_codec_flag(flag: Option<&str>, copy: &mut bool, encoder: &mut Option<String>) {
    match flag {
        Some("copy") => {
            *copy = true;
            *encoder = None;
        }
        Some(name) => {
            *copy = false;
            *encoder = Some(name.to_string());
        }
        None => {}
    }
}

fn print_registries(codecs: &CodecRegistry, formats: &FormatRegistry) {
    println!("解码器:");
    for (id, name) in codecs.list_decoders() {
        println!("  {name:<12} {}", id.media_type());
    }
    println!("编码器:");
    for (id, name) in codecs.list_encoders() {
        println!("  {name:<12} {}", id.media_type());
    }
    println!("解封装器:");
    for (id, name) in formats.list_demuxers() {
        println!("  {name:<12} .{}", id.extensions().join(" ."));
    }
    println!("封装器:");
    for (id, name) in formats.list_muxers() {
        println!("  {name:<12} .{}", id.extensions().join(" ."));
    }
}

fn print_banner() {
    eprintln!(
        "reel 版本 {} -- 纯 Rust 逐流转码工具",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!("用法: reel-cli -i <输入文件> -o <输出文件> [选项]");
    eprintln!();
    eprintln!("示例:");
    eprintln!("  reel-cli -i in.wav -o out.wav --frame-size 1024");
    eprintln!("  reel-cli -i in.wav -o out.wav -c pcm_f32le --volume 0.5");
    eprintln!("  reel-cli -i in.mkv -o out.mkv --vcodec copy -c opus");
    eprintln!();
    eprintln!("使用 --help 查看全部选项, --list 查看可用的编解码器与格式");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("reel-cli").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_codec_flag_copy_and_name() {
        let cli = parse(&["-i", "a.mkv", "-o", "b.mkv", "--vcodec", "copy", "-c", "pcm_s16le"]);
        let policy = build_policy(&cli).unwrap();
        assert!(policy.copy_video);
        assert!(!policy.copy_audio);
        assert_eq!(policy.audio_encoder.as_deref(), Some("pcm_s16le"));
        assert_eq!(policy.video_encoder, None);
    }

    #[test]
    fn test_flags_override_policy_file() {
        let dir = std::env::temp_dir().join(format!("reel-cli-policy-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("policy.json");
        std::fs::write(
            &path,
            r#"{"copy_audio": true, "audio_frame_size": 512, "audio_volume": 2.0}"#,
        )
        .unwrap();
        let path = path.to_string_lossy().into_owned();

        let cli = parse(&["--policy", &path, "-c", "pcm_f32le", "--frame-size", "960"]);
        let policy = build_policy(&cli).unwrap();
        assert!(!policy.copy_audio);
        assert_eq!(policy.audio_encoder.as_deref(), Some("pcm_f32le"));
        assert_eq!(policy.audio_frame_size, Some(960));
        assert_eq!(policy.audio_volume, Some(2.0));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_frame_size_zero_rejected() {
        let cli = parse(&["--frame-size", "0"]);
        assert!(build_policy(&cli).is_err());
    }
}
