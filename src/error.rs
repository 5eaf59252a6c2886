// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// 起動処理・アセット読み込み・フレーム表示で発生するエラー。
#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create render surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to acquire graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("render surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("image decoder was built without {0:?} support")]
    MissingImageFormat(image::ImageFormat),

    #[error("failed to load image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("out of GPU memory while acquiring a frame")]
    OutOfMemory,

    #[error("invalid spritesheet: {0}")]
    InvalidSpritesheet(String),

    #[error("sprite index {index} out of range (sheet holds {count} sprites)")]
    SpriteIndexOutOfRange { index: u32, count: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// クレート共通の Result 型。
pub type Result<T, E = GameError> = std::result::Result<T, E>;
