// src/logger.rs
use env_logger::Builder;
use log::LevelFilter;

use crate::error::Result;

pub struct LoggerConfig {
    /// "graphics" ターゲットのログレベル
    pub graphics_level: LevelFilter,
    /// デフォルトのログレベル
    pub default_level: LevelFilter,
    /// ログをファイルに出力する場合のファイルパス（None なら標準エラー出力のみ）
    pub file_output: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            graphics_level: LevelFilter::Info,
            default_level: LevelFilter::Info,
            file_output: None,
        }
    }
}

/// LoggerConfig を用いたロガーの初期化。
/// `RUST_LOG` が設定されていれば、その指定が優先される。
pub fn init_logger_with_config(config: LoggerConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder
        .filter(Some("graphics"), config.graphics_level)
        .filter(None, config.default_level)
        .parse_default_env();
    if let Some(file_path) = config.file_output {
        let file = std::fs::File::create(file_path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}
