//! # 头像 / 横幅图片处理 — 命令行入口
//!
//! 本文件仅负责参数解析、设置加载与结果输出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。
//!
//! ```text
//! profile-image inspect avatar.png
//! profile-image compress avatar.png --preset profile -o avatar.jpg
//! profile-image crop banner.png --preset banner --rotation 15 -o banner.jpg --preview preview.jpg
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;

use clap::{Args, Parser, Subcommand};

use profile_image::cropper::{CropCallbacks, CropConfig};
use profile_image::error::AppError;
use profile_image::image_handler::{
    CompressOptions, EncodedImage, ImageConfig, ImageHandler, ImagePreset, ImageSource, OutputFormat,
    format_file_size,
};
use profile_image::settings::load_settings;

/// 头像 / 横幅图片的压缩与裁剪工具。
#[derive(Parser, Debug)]
#[command(name = "profile-image", version, about = "Compress and crop profile / banner images")]
struct Cli {
    /// 设置文件（JSON），覆盖默认图片配置
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 读取图片头信息并校验是否可上传
    Inspect {
        input: PathBuf,
    },
    /// 有界缩放并重新编码
    Compress(CompressArgs),
    /// 按变换参数裁剪并输出固定尺寸图片
    Crop(CropArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    input: PathBuf,

    /// 用途预设：profile / banner
    #[arg(long, value_name = "PRESET")]
    preset: Option<String>,

    #[arg(long, value_name = "PX")]
    max_width: Option<u32>,

    #[arg(long, value_name = "PX")]
    max_height: Option<u32>,

    /// 编码质量（0~1，仅 JPEG 生效）
    #[arg(short, long, value_name = "0-1")]
    quality: Option<f32>,

    /// 输出格式：jpeg / png / webp
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// 输出文件；省略时向标准输出打印 data URL
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CropArgs {
    input: PathBuf,

    /// 用途预设：profile / banner
    #[arg(long, value_name = "PRESET")]
    preset: Option<String>,

    /// 裁剪框宽高比（宽 / 高）
    #[arg(long, value_name = "RATIO")]
    aspect: Option<f64>,

    #[arg(long, value_name = "PX")]
    width: Option<u32>,

    #[arg(long, value_name = "PX")]
    height: Option<u32>,

    /// 从恒等变换开始，而不是自动适配
    #[arg(long)]
    reset: bool,

    #[arg(long)]
    scale: Option<f64>,

    /// 旋转角度（度，顺时针）
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<f64>,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pan_x: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pan_y: f64,

    /// 裁剪前先按预设压缩源图
    #[arg(long)]
    precompress: bool,

    /// 输出文件；省略时向标准输出打印 data URL
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// 额外写出实时预览图
    #[arg(long, value_name = "FILE")]
    preview: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let handler = ImageHandler::new(ImageConfig::default())?;
    if let Some(path) = &cli.settings {
        match load_settings(path)? {
            Some(settings) => handler.apply_settings(&settings)?,
            None => log::warn!("⚠️ 设置文件不存在，使用默认配置：{}", path.display()),
        }
    }

    match cli.command {
        Command::Inspect { input } => inspect(&handler, &input),
        Command::Compress(args) => compress(&handler, args).await,
        Command::Crop(args) => crop(&handler, args).await,
    }
}

fn inspect(handler: &ImageHandler, input: &Path) -> Result<(), AppError> {
    let bytes = std::fs::read(input)?;
    let declared_mime = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    let (width, height) = handler.inspect_dimensions(ImageSource::Bytes(bytes.clone()))?;
    println!("file:   {}", input.display());
    println!("type:   {}", declared_mime);
    println!("size:   {}", format_file_size(bytes.len() as u64));
    println!("pixels: {} × {} ({:.2}:1)", width, height, width as f64 / height.max(1) as f64);

    match handler.validate_upload(&bytes, declared_mime) {
        Ok(()) => println!("upload: accepted"),
        Err(err) => println!("upload: rejected ({})", err),
    }
    Ok(())
}

async fn compress(handler: &ImageHandler, args: CompressArgs) -> Result<(), AppError> {
    let mut options = match args.preset.as_deref() {
        Some(preset) => ImagePreset::from_str(preset)?.compress_options(),
        None => CompressOptions::default(),
    };
    if let Some(max_width) = args.max_width {
        options.max_width = max_width;
    }
    if let Some(max_height) = args.max_height {
        options.max_height = max_height;
    }
    if let Some(quality) = args.quality {
        options.quality = quality;
    }
    if let Some(format) = args.format.as_deref() {
        options.format = OutputFormat::from_str(format)?;
    }

    let source = ImageSource::FilePath(path_string(&args.input)?);
    let encoded = handler.compress_async(source, options).await?;
    emit(&encoded, args.output.as_deref())
}

async fn crop(handler: &ImageHandler, args: CropArgs) -> Result<(), AppError> {
    let preset = args.preset.as_deref().map(ImagePreset::from_str).transpose()?;
    let mut crop_config = preset.map(ImagePreset::crop_config).unwrap_or_default();
    if let Some(aspect) = args.aspect {
        crop_config.aspect_ratio = aspect;
    }
    if let Some(width) = args.width {
        crop_config.output_width = width;
    }
    crop_config.output_height = args.height;

    let source = if args.precompress {
        let options = preset.map(ImagePreset::compress_options).unwrap_or_default();
        let compressed = handler
            .compress_async(ImageSource::FilePath(path_string(&args.input)?), options)
            .await?;
        ImageSource::Bytes(compressed.into_bytes())
    } else {
        ImageSource::FilePath(path_string(&args.input)?)
    };

    let (callbacks, receiver) = channel_callbacks();
    let mut session = handler.open_cropper_async(source, &crop_config, callbacks).await?;
    apply_transform(&mut session, &args)?;

    if let Some(path) = &args.preview {
        std::fs::write(path, session.preview_encoded()?.bytes())?;
        log::info!("🖼️ 预览已写入 {}", path.display());
    }

    session.commit()?;
    let encoded = receiver
        .try_recv()
        .map_err(|_| AppError::Cli("裁剪会话未产生输出".to_string()))?;
    emit(&encoded, args.output.as_deref())
}

/// 把提交结果转发到通道；接收端已关闭时只记录警告。
fn channel_callbacks() -> (CropCallbacks, mpsc::Receiver<EncodedImage>) {
    let (sender, receiver) = mpsc::channel();
    let callbacks = CropCallbacks::new(
        move |image: EncodedImage| {
            if sender.send(image).is_err() {
                log::warn!("⚠️ 裁剪结果接收端已关闭，输出被丢弃");
            }
        },
        || log::info!("裁剪已取消"),
    );
    (callbacks, receiver)
}

fn apply_transform(session: &mut profile_image::cropper::CropSession, args: &CropArgs) -> Result<(), AppError> {
    if args.reset {
        session.reset()?;
    }
    if let Some(scale) = args.scale {
        session.set_scale(scale)?;
    }
    if let Some(rotation) = args.rotation {
        session.set_rotation(rotation)?;
    }
    if args.pan_x != 0.0 || args.pan_y != 0.0 {
        session.pan(args.pan_x, args.pan_y)?;
    }

    let transform = session.transform();
    log::info!(
        "🎛️ 变换 scale={:.4} rotation={}° pan=({}, {}) 输出 {}",
        transform.scale,
        transform.display_rotation(),
        transform.pan.x,
        transform.pan.y,
        session.output_spec().size_label()
    );
    Ok(())
}

fn emit(encoded: &EncodedImage, output: Option<&Path>) -> Result<(), AppError> {
    match output {
        Some(path) => {
            std::fs::write(path, encoded.bytes())?;
            log::info!(
                "💾 已写入 {}（{}，{}）",
                path.display(),
                encoded.mime_type(),
                format_file_size(encoded.bytes().len() as u64)
            );
        }
        None => println!("{}", encoded.to_data_url()),
    }
    Ok(())
}

fn path_string(path: &Path) -> Result<String, AppError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::Cli(format!("路径不是合法 UTF-8：{}", path.display())))
}
