// src/config.rs

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::error::{GameError, Result};

/// ゲーム全体の設定情報をまとめた構造体。
/// TOML ファイルから読み込むことができ、省略された項目はデフォルト値になる。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// ウィンドウの幅（論理ピクセル）
    pub window_width: u32,
    /// ウィンドウの高さ（論理ピクセル）
    pub window_height: u32,
    /// ゲームの論理解像度の幅
    pub logical_width: u32,
    /// ゲームの論理解像度の高さ
    pub logical_height: u32,
    /// ウィンドウのタイトル
    pub title: String,
    /// stretch_mode が true の場合、描画座標はウィンドウの物理ピクセルに一致する。
    /// false の場合、論理解像度をウィンドウ全体に拡大して表示する。
    pub stretch_mode: bool,
    /// ウィンドウのリサイズを許可するか
    pub resizable: bool,
    /// FPS 上限。None ならフレームレート制限なし
    pub frame_limit: Option<u32>,
    /// 画面クリア色（sRGB）
    pub clear_color: [u8; 3],
    /// アセット関連の設定
    pub assets: AssetConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: 960,
            window_height: 540,
            logical_width: 960,
            logical_height: 540,
            title: "A Pair of Squares".to_string(),
            stretch_mode: false,
            resizable: false,
            frame_limit: None,
            clear_color: [0x03, 0x07, 0x10],
            assets: AssetConfig::default(),
        }
    }
}

impl GameConfig {
    /// 指定パスの TOML ファイルから設定を読み込む。
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text).map_err(|source| GameError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// ファイルが存在しなければデフォルト設定を返す。
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("{} not found, using default config", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// 起動前に設定値の妥当性を検証する。
    pub fn validate(&self) -> Result<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(GameError::Config("window size must be non-zero".into()));
        }
        if self.logical_width == 0 || self.logical_height == 0 {
            return Err(GameError::Config("logical resolution must be non-zero".into()));
        }
        if self.frame_limit == Some(0) {
            return Err(GameError::Config("frame_limit must be positive when set".into()));
        }
        self.assets.validate()
    }
}

/// スプライトシートなどのアセットの場所と分割方法。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// アセットのルートディレクトリ。相対パスなら作業ディレクトリ、次に実行ファイルの場所から解決する
    pub root: PathBuf,
    /// ルートからのスプライトシート画像の相対パス
    pub spritesheet: String,
    /// 1スプライトの一辺のピクセル数
    pub sprite_size: u32,
    /// スプライトシート1行あたりのスプライト数
    pub sprites_per_row: u32,
    /// スプライト描画時の拡大率
    pub sprite_scale: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            spritesheet: "spritesheet.png".to_string(),
            sprite_size: 16,
            sprites_per_row: 4,
            sprite_scale: 4.0,
        }
    }
}

impl AssetConfig {
    fn validate(&self) -> Result<()> {
        if self.sprite_size == 0 {
            return Err(GameError::Config("assets.sprite_size must be non-zero".into()));
        }
        if self.sprites_per_row == 0 {
            return Err(GameError::Config("assets.sprites_per_row must be non-zero".into()));
        }
        if !(self.sprite_scale > 0.0 && self.sprite_scale.is_finite()) {
            return Err(GameError::Config("assets.sprite_scale must be positive and finite".into()));
        }
        Ok(())
    }

    /// 作業ディレクトリと実行ファイルのディレクトリを基準にルートを解決する。
    pub fn resolve_root(&self) -> PathBuf {
        let mut bases = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            bases.push(cwd);
        }
        if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            bases.push(dir);
        }
        resolve_root_from(&self.root, &bases)
    }
}

/// 絶対パスはそのまま返す。相対パスは最初に存在する `base/root` を返し、
/// どこにも無ければ先頭の基準ディレクトリ（なければ相対パスのまま）を使う。
pub fn resolve_root_from(root: &Path, bases: &[PathBuf]) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf();
    }
    bases
        .iter()
        .map(|base| base.join(root))
        .find(|candidate| candidate.is_dir())
        .or_else(|| bases.first().map(|base| base.join(root)))
        .unwrap_or_else(|| root.to_path_buf())
}
