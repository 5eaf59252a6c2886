// src/asset_manager.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::ImageFormat;
use log::{debug, warn};

use crate::error::{GameError, Result};
use crate::renderer::{Renderer, TextureHandle};

/// 起動時に読み込みをサポートしている必要がある画像形式。
pub const REQUIRED_IMAGE_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];

/// 画像デコーダが指定形式を読み込めるか確認する。
pub fn check_image_support(formats: &[ImageFormat]) -> Result<()> {
    match formats.iter().find(|format| !format.reading_enabled()) {
        Some(&missing) => Err(GameError::MissingImageFormat(missing)),
        None => Ok(()),
    }
}

/// アセット管理用の構造体。
/// アセットルートからの相対パスをキーにキャッシュして、重複読み込みを防ぐ。
pub struct AssetManager<T = TextureHandle> {
    root: PathBuf,
    textures: HashMap<PathBuf, Rc<T>>,
}

impl<T> AssetManager<T> {
    /// 新しい AssetManager を生成する
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            textures: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// アセットルートからの相対パスを解決する。
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// キャッシュ済みならそれを返し、無ければ `load` で読み込んでキャッシュする。
    pub fn load_with<F>(&mut self, relative: impl AsRef<Path>, load: F) -> Result<Rc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let path = self.resolve(relative);
        if let Some(texture) = self.textures.get(&path) {
            return Ok(Rc::clone(texture));
        }
        let texture = Rc::new(load(&path)?);
        debug!("cached asset {}", path.display());
        self.textures.insert(path, Rc::clone(&texture));
        Ok(texture)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// 保持しているアセットを全て解放する。
    /// 他で共有されたままのものは、その参照が破棄された時点で解放される。
    pub fn clear(&mut self) {
        for (path, texture) in self.textures.drain() {
            if Rc::strong_count(&texture) > 1 {
                warn!("asset {} still shared while clearing cache", path.display());
            }
        }
    }
}

impl AssetManager<TextureHandle> {
    /// 指定されたパスのテクスチャをキャッシュから取得、もしくは新たに読み込みます。
    pub fn load_texture(&mut self, renderer: &Renderer, relative: impl AsRef<Path>) -> Result<Rc<TextureHandle>> {
        self.load_with(relative, |path| renderer.load_texture(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn png_and_jpeg_are_supported() {
        assert!(check_image_support(&REQUIRED_IMAGE_FORMATS).is_ok());
    }

    #[test]
    fn same_path_is_loaded_once() {
        let loads = Cell::new(0);
        let mut assets: AssetManager<String> = AssetManager::new("assets");
        let load = |path: &Path| {
            loads.set(loads.get() + 1);
            Ok(path.display().to_string())
        };

        let first = assets.load_with("spritesheet.png", load).unwrap();
        let second = assets.load_with("spritesheet.png", load).unwrap();
        let other = assets.load_with("font.png", load).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(loads.get(), 2);
        assert_eq!(*first, Path::new("assets").join("spritesheet.png").display().to_string());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut assets: AssetManager<String> = AssetManager::new("assets");
        let result = assets.load_with("missing.png", |_| Err(GameError::NoAdapter));
        assert!(result.is_err());
        assert!(assets.is_empty());
    }

    #[test]
    fn clear_releases_cached_assets() {
        let mut assets: AssetManager<String> = AssetManager::new("assets");
        let held = assets.load_with("a.png", |_| Ok("a".to_string())).unwrap();
        assets.load_with("b.png", |_| Ok("b".to_string())).unwrap();
        assert_eq!(assets.len(), 2);

        assets.clear();
        assert!(assets.is_empty());
        assert_eq!(Rc::strong_count(&held), 1);
    }
}
