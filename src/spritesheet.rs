// src/spritesheet.rs

use std::rc::Rc;

use crate::canvas::{Canvas, Rect, SourceRect, Texture};
use crate::error::{GameError, Result};

/// 正方形スプライトを格子状に並べた画像。
/// インデックス i のスプライトは (i % columns, i / columns) のセルにある。
pub struct Spritesheet<T> {
    texture: Rc<T>,
    sprite_size: u32,
    columns: u32,
    rows: u32,
    scale: f32,
}

impl<T: Texture> Spritesheet<T> {
    /// テクスチャ・スプライトサイズ・1行あたりのスプライト数からスプライトシートを作る。
    /// 行数はテクスチャの高さから求める。
    pub fn new(texture: Rc<T>, sprite_size: u32, columns: u32, scale: f32) -> Result<Self> {
        if sprite_size == 0 {
            return Err(GameError::InvalidSpritesheet("sprite size must be non-zero".into()));
        }
        if columns == 0 {
            return Err(GameError::InvalidSpritesheet("sprites per row must be non-zero".into()));
        }
        let row_width = sprite_size.checked_mul(columns).ok_or_else(|| {
            GameError::InvalidSpritesheet(format!(
                "{columns} sprites of {sprite_size}px do not fit in a single row"
            ))
        })?;
        let (width, height) = texture.size();
        if width < row_width {
            return Err(GameError::InvalidSpritesheet(format!(
                "texture is {width}px wide, {columns} sprites of {sprite_size}px need {row_width}px"
            )));
        }
        let rows = height / sprite_size;
        if rows == 0 {
            return Err(GameError::InvalidSpritesheet(format!(
                "texture is {height}px tall, shorter than one {sprite_size}px row"
            )));
        }
        Ok(Self {
            texture,
            sprite_size,
            columns,
            rows,
            scale,
        })
    }

    pub fn sprite_size(&self) -> u32 {
        self.sprite_size
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// シートに含まれるスプライトの総数。
    pub fn sprite_count(&self) -> u32 {
        self.rows * self.columns
    }

    /// スプライトインデックスに対応するテクスチャ上の矩形を返す。
    pub fn source_rect(&self, index: u32) -> Result<SourceRect> {
        let count = self.sprite_count();
        if index >= count {
            return Err(GameError::SpriteIndexOutOfRange { index, count });
        }
        let column = index % self.columns;
        let row = index / self.columns;
        Ok(SourceRect {
            x: column * self.sprite_size,
            y: row * self.sprite_size,
            w: self.sprite_size,
            h: self.sprite_size,
        })
    }

    /// スプライトを拡大率付きで (x, y) に描画する。
    /// 座標もスプライトと同じ拡大率で拡大される。
    pub fn sprite_scaled<C>(&self, canvas: &mut C, index: u32, x: f32, y: f32) -> Result<()>
    where
        C: Canvas<Texture = T>,
    {
        let src = self.source_rect(index)?;
        let size = self.sprite_size as f32 * self.scale;
        let dst = Rect {
            x: x * self.scale,
            y: y * self.scale,
            w: size,
            h: size,
        };
        canvas.blit(&self.texture, src, dst);
        Ok(())
    }
}
