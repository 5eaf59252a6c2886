// src/canvas.rs

use std::rc::Rc;

use crate::error::Result;

/// テクスチャ内の矩形（テクセル単位）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// 描画先の矩形（論理座標、左上原点）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// 描画に使えるテクスチャ。
pub trait Texture {
    /// テクスチャの (幅, 高さ) をピクセル単位で返す。
    fn size(&self) -> (u32, u32);
}

/// 1フレーム分の描画先。
///
/// フレームごとに `clear` → `blit`（複数回）→ `present` の順で呼ばれる。
pub trait Canvas {
    type Texture: Texture;

    /// 前フレームの描画内容を破棄し、画面をクリア色で塗りつぶす準備をする。
    fn clear(&mut self);

    /// テクスチャの `src` 領域を `dst` に拡大縮小して描画する。
    fn blit(&mut self, texture: &Rc<Self::Texture>, src: SourceRect, dst: Rect);

    /// 描画した内容を画面に表示する。
    fn present(&mut self) -> Result<()>;
}
