// src/main.rs
use std::path::Path;
use std::process::ExitCode;

use log::error;
use pair_of_squares::{init_logger_with_config, GameConfig, LoggerConfig};

/// 作業ディレクトリにあれば読み込む設定ファイル
const CONFIG_FILE: &str = "squares.toml";

fn main() -> ExitCode {
    if let Err(err) = init_logger_with_config(LoggerConfig::default()) {
        eprintln!("{}", err);
    }

    let result = GameConfig::load_or_default(Path::new(CONFIG_FILE)).and_then(pair_of_squares::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
