//! 日志模块：基于 env_logger 0.11.8（彩色控制台 + 文件镜像 + 按大小轮转）
use env_logger::fmt::Formatter;
use env_logger::{Builder, Target, WriteStyle};
use log::{Level, LevelFilter, Record};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

// ==================== 配置常量 ====================
const LOG_DIR: &str = "LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";
const LOG_LEVEL: &str = "LOG_LEVEL";
const DEFAULT_LOG_LEVEL: &str = "INFO";
const LOG_FILE_NAME: &str = "wallet-tx-tracker.log";
const LOG_MAX_SIZE_MB: u64 = 10;
const LOG_MAX_ROTATIONS: usize = 5;

static INIT_LOGGER: Once = Once::new();
static FILE_WRITER: Mutex<Option<File>> = Mutex::new(None);

fn level_from_str(level: &str) -> Option<LevelFilter> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::Trace),
        "DEBUG" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" => Some(LevelFilter::Warn),
        "ERROR" => Some(LevelFilter::Error),
        _ => None,
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[91m",
        Level::Warn => "\x1b[93m",
        Level::Info => "\x1b[92m",
        Level::Debug => "\x1b[96m",
        Level::Trace => "\x1b[95m",
    }
}

// ==================== 初始化日志系统 ====================
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let log_dir = std::env::var(LOG_DIR).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        let log_level =
            std::env::var(LOG_LEVEL).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let level_filter = level_from_str(&log_level).unwrap_or_else(|| {
            eprintln!("⚠️ 无效日志级别「{}」，使用默认 INFO", log_level);
            LevelFilter::Info
        });

        let log_file_path = open_log_file(&log_dir);
        let mirror_to_file = log_file_path.is_some();

        let mut builder = Builder::from_default_env();
        builder
            .filter(None, level_filter)
            // ethers 内部的轮询日志过于频繁
            .filter(Some("ethers_providers"), LevelFilter::Warn)
            .filter(Some("ethers_contract"), LevelFilter::Warn)
            .write_style(WriteStyle::Auto)
            .format(move |f: &mut Formatter, record: &Record| {
                let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f");
                let module = record.module_path().unwrap_or("unknown");

                if mirror_to_file {
                    let line = format!(
                        "[{}] [{}] [{:>5}] {} - {}\n",
                        now,
                        std::thread::current().name().unwrap_or("unknown"),
                        record.level(),
                        module,
                        record.args()
                    );
                    // 文件写入失败不影响控制台输出
                    if let Ok(mut guard) = FILE_WRITER.lock() {
                        if let Some(file) = guard.as_mut() {
                            let _ = file.write_all(line.as_bytes());
                        }
                    }
                }

                writeln!(
                    f,
                    "[{}] [{}{:>5}\x1b[0m] [\x1b[31m{}\x1b[0m] - {}",
                    now,
                    level_color(record.level()),
                    record.level(),
                    module,
                    record.args()
                )
            })
            .target(Target::Stdout);

        match builder.try_init() {
            Ok(()) => log::info!(
                "✅ 日志系统初始化完成 | 级别: {} | 日志文件: {}",
                level_filter,
                log_file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(仅控制台)".to_string())
            ),
            Err(e) => eprintln!("❌ 日志初始化失败: {}", e),
        }
    });
}

fn open_log_file(log_dir: &str) -> Option<PathBuf> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("❌ 创建日志目录失败: {}", e);
        return None;
    }
    if let Err(e) = rotate_logs(log_dir, LOG_FILE_NAME) {
        eprintln!("⚠️ 日志轮转失败: {}", e);
    }

    let path = Path::new(log_dir).join(LOG_FILE_NAME);
    match File::options().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut guard) = FILE_WRITER.lock() {
                *guard = Some(file);
            }
            Some(path)
        }
        Err(e) => {
            eprintln!("❌ 创建日志文件失败: {}", e);
            None
        }
    }
}

// ==================== 日志轮转 ====================
fn rotate_logs(log_dir: &str, log_file: &str) -> io::Result<()> {
    let log_path = Path::new(log_dir).join(log_file);
    if !log_path.exists() {
        return Ok(());
    }

    let file_size_mb = fs::metadata(&log_path)?.len() / (1024 * 1024);
    if file_size_mb < LOG_MAX_SIZE_MB {
        return Ok(());
    }

    // xxx.log.4 → xxx.log.5, ..., xxx.log → xxx.log.1
    for i in (1..LOG_MAX_ROTATIONS).rev() {
        let src = Path::new(log_dir).join(format!("{}.{}", log_file, i));
        if src.exists() {
            fs::rename(&src, Path::new(log_dir).join(format!("{}.{}", log_file, i + 1)))?;
        }
    }
    fs::rename(&log_path, Path::new(log_dir).join(format!("{}.1", log_file)))
}

// ==================== 便捷日志宏 ====================
#[macro_export]
macro_rules! log_trace { ($($arg:tt)*) => { log::trace!($($arg)*) }; }
#[macro_export]
macro_rules! log_debug { ($($arg:tt)*) => { log::debug!($($arg)*) }; }
#[macro_export]
macro_rules! log_info  { ($($arg:tt)*) => { log::info!($($arg)*) }; }
#[macro_export]
macro_rules! log_warn  { ($($arg:tt)*) => { log::warn!($($arg)*) }; }
#[macro_export]
macro_rules! log_error { ($($arg:tt)*) => { log::error!($($arg)*) }; }
