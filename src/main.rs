//! # OCRLens — 命令行入口
//!
//! 本文件只负责参数解析、依赖组装与结果输出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ocrlens::clipboard::SystemClipboard;
use ocrlens::cropper::{DisplaySize, PixelCrop};
use ocrlens::db::{self, DbState};
use ocrlens::error::AppError;
use ocrlens::image_handler::{ImageConfig, ImageHandler, ImageSource};
use ocrlens::recognition::{
    CredentialStore, GeminiService, RecognitionClient, SUPPORTED_LANGUAGES, SqliteCredentialStore,
    mask_api_key,
};
use ocrlens::session::{OcrSession, RequestState};
use ocrlens::settings::{self, AppSettings};
use ocrlens::storage;

/// 图片转文字：裁剪后交给远程多模态服务识别，可选翻译。
#[derive(Parser, Debug)]
#[command(name = "ocrlens", version, about = "图片文字识别与翻译工具")]
struct Cli {
    /// 设置文件路径（默认位于系统配置目录）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 数据目录（保存密钥数据库）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 识别一张图片中的文字
    Extract(ExtractArgs),
    /// 管理识别服务的 API Key
    #[command(subcommand)]
    Key(KeyCommand),
    /// 列出支持的语言
    Languages,
    /// 查看或初始化设置文件
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true)))]
struct ExtractArgs {
    /// 本地图片文件
    #[arg(long, group = "source")]
    file: Option<PathBuf>,

    /// 远程图片链接
    #[arg(long, group = "source")]
    url: Option<String>,

    /// 从系统剪贴板粘贴
    #[arg(long, group = "source")]
    paste: bool,

    /// Base64 或 Data URL
    #[arg(long, group = "source")]
    base64: Option<String>,

    /// 裁剪区域 X,Y,W,H（显示坐标，默认整张图）
    #[arg(long, value_parser = parse_crop)]
    crop: Option<PixelCrop>,

    /// 显示尺寸 WxH（默认等于原图尺寸）
    #[arg(long, value_parser = parse_display, requires = "crop")]
    display: Option<DisplaySize>,

    /// 源语言代码（默认取设置文件）
    #[arg(long)]
    source_lang: Option<String>,

    /// 翻译为指定语言
    #[arg(long)]
    translate_to: Option<String>,

    /// 将结果复制到剪贴板
    #[arg(long, default_value_t = false)]
    copy: bool,

    /// 保存裁剪后的 PNG
    #[arg(long)]
    save_crop: Option<PathBuf>,

    /// 以 JSON 输出会话快照
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// 保存密钥
    Set { key: String },
    /// 清除已保存的密钥
    Clear,
    /// 显示脱敏后的密钥
    Show,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 输出当前生效的设置
    Show,
    /// 写入默认设置文件（已存在时不覆盖）
    Init,
}

fn parse_crop(value: &str) -> Result<PixelCrop, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("裁剪区域格式应为 X,Y,W,H：{}", e))?;

    match parts.as_slice() {
        [x, y, width, height] if *width >= 0.0 && *height >= 0.0 => Ok(PixelCrop {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        [_, _, _, _] => Err("裁剪区域宽高不能为负数".to_string()),
        _ => Err("裁剪区域格式应为 X,Y,W,H".to_string()),
    }
}

fn parse_display(value: &str) -> Result<DisplaySize, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "显示尺寸格式应为 WxH".to_string())?;
    let width = w.trim().parse::<f64>().map_err(|e| format!("显示宽度无效：{}", e))?;
    let height = h.trim().parse::<f64>().map_err(|e| format!("显示高度无效：{}", e))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("显示尺寸必须为正数".to_string());
    }
    Ok(DisplaySize::new(width, height))
}

fn settings_path(cli: &Cli) -> Result<PathBuf, AppError> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => settings::default_settings_path(),
    }
}

fn open_credential_store(cli: &Cli) -> Result<Arc<dyn CredentialStore>, AppError> {
    let data_dir = storage::data_dir(cli.data_dir.as_deref())?;
    let conn = db::init_db(&db::db_path_in(&data_dir))?;
    Ok(Arc::new(SqliteCredentialStore::new(Arc::new(DbState::new(conn)))))
}

async fn run_extract(cli: &Cli, args: &ExtractArgs) -> Result<(), AppError> {
    let app_settings = AppSettings::load_from_path(&settings_path(cli)?)?;

    let store = open_credential_store(cli)?;
    let service = GeminiService::new(&app_settings.service)?;
    let recognizer = RecognitionClient::new(store, Arc::new(service))
        .with_temperature(app_settings.service.temperature);
    let images = ImageHandler::new(ImageConfig::from_network_settings(&app_settings.network))?;

    let mut recognition = app_settings.recognition.clone();
    if let Some(source) = &args.source_lang {
        recognition.source_language = source.clone();
    }
    if let Some(target) = &args.translate_to {
        recognition.translation_enabled = true;
        recognition.target_language = target.clone();
    }

    let mut session = OcrSession::new(
        images,
        recognizer,
        Box::new(SystemClipboard::new()),
        app_settings.recognition.clone(),
    );
    session.set_recognition_settings(recognition)?;

    // 获取
    let acquired = if args.paste {
        session.paste().await
    } else {
        let source = if let Some(path) = &args.file {
            ImageSource::FilePath(path.to_string_lossy().to_string())
        } else if let Some(url) = &args.url {
            ImageSource::Url(url.clone())
        } else if let Some(data) = &args.base64 {
            ImageSource::Base64(data.clone())
        } else {
            return Err(AppError::InvalidArgument("需要指定图片来源".to_string()));
        };
        session.acquire(source).await
    };
    if !acquired {
        let message = session
            .error()
            .map(str::to_string)
            .unwrap_or_else(|| "剪贴板中没有图片".to_string());
        return Err(AppError::InvalidArgument(message));
    }

    // 裁剪：未指定显示尺寸时按原图尺寸显示
    let raw = session
        .raw_image()
        .cloned()
        .ok_or_else(|| AppError::InvalidArgument("原图不存在".to_string()))?;
    let (natural_w, natural_h) = session.images().dimensions(&raw)?;
    let display = args
        .display
        .unwrap_or_else(|| DisplaySize::new(natural_w as f64, natural_h as f64));
    session.on_image_displayed(display);

    let crop = args.crop.unwrap_or(PixelCrop {
        x: 0.0,
        y: 0.0,
        width: display.width,
        height: display.height,
    });
    session.cropper_mut().commit(crop);
    if !session.confirm_crop().await {
        let message = session.error().unwrap_or("处理裁剪失败").to_string();
        return Err(AppError::InvalidArgument(message));
    }

    if let (Some(path), Some(image)) = (&args.save_crop, session.image()) {
        storage::write_image(path, &image.bytes)?;
    }

    // 识别
    session.extract().await;

    if args.json {
        let json = serde_json::to_string_pretty(&session.snapshot())
            .map_err(|e| AppError::Storage(format!("序列化结果失败: {}", e)))?;
        println!("{}", json);
    } else if let Some(text) = session.result() {
        println!("{}", text);
    }

    if session.status() == RequestState::Error {
        let message = session.error().unwrap_or_default().to_string();
        return Err(AppError::InvalidArgument(message));
    }

    if args.copy && session.copy_result()? {
        log::info!("📋 结果已复制到剪贴板");
    }

    Ok(())
}

fn run_key(cli: &Cli, command: &KeyCommand) -> Result<(), AppError> {
    let store = open_credential_store(cli)?;
    match command {
        KeyCommand::Set { key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err(AppError::InvalidArgument("密钥不能为空".to_string()));
            }
            store.set(key)?;
            println!("{}", mask_api_key(Some(key)));
        }
        KeyCommand::Clear => {
            store.clear()?;
        }
        KeyCommand::Show => {
            let stored = store.get()?;
            println!("{}", mask_api_key(stored.as_deref()));
        }
    }
    Ok(())
}

fn run_languages() {
    for lang in SUPPORTED_LANGUAGES {
        println!("{:<6}{}", lang.code, lang.name);
    }
}

fn run_config(cli: &Cli, command: &ConfigCommand) -> Result<(), AppError> {
    let path = settings_path(cli)?;
    match command {
        ConfigCommand::Show => {
            let current = AppSettings::load_from_path(&path)?;
            let json = serde_json::to_string_pretty(&current)
                .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;
            println!("{}", json);
        }
        ConfigCommand::Init => {
            if path.exists() {
                println!("设置文件已存在: {}", path.display());
            } else {
                AppSettings::default().save_to_path(&path)?;
                println!("已写入默认设置: {}", path.display());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Extract(args) => run_extract(&cli, args).await,
        Command::Key(command) => run_key(&cli, command),
        Command::Languages => {
            run_languages();
            Ok(())
        }
        Command::Config(command) => run_config(&cli, command),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_crop_accepts_four_numbers() {
        let crop = parse_crop("10, 20.5,30,40").expect("valid crop");

        assert_eq!(crop, PixelCrop { x: 10.0, y: 20.5, width: 30.0, height: 40.0 });
    }

    #[test]
    fn parse_crop_rejects_bad_input() {
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
        assert!(parse_crop("0,0,-5,5").is_err());
    }

    #[test]
    fn parse_display_accepts_wxh() {
        assert_eq!(parse_display("800x600").expect("valid"), DisplaySize::new(800.0, 600.0));
        assert!(parse_display("800").is_err());
        assert!(parse_display("0x600").is_err());
    }

    #[test]
    fn cli_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["ocrlens", "extract"]).is_err());
        assert!(Cli::try_parse_from(["ocrlens", "extract", "--file", "a.png", "--paste"]).is_err());
        assert!(Cli::try_parse_from(["ocrlens", "extract", "--paste"]).is_ok());
    }

    #[test]
    fn cli_display_requires_crop() {
        assert!(Cli::try_parse_from(["ocrlens", "extract", "--paste", "--display", "10x10"]).is_err());
    }
}
