// src/player.rs

use cgmath::{InnerSpace, Vector2, Zero};

use crate::canvas::Canvas;
use crate::error::Result;
use crate::input::{Action, InputHandler};
use crate::spritesheet::Spritesheet;

/// プレイヤーの移動可能範囲（スプライト座標）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

/// 入力に応じて動く唯一のエンティティ。
#[derive(Debug, Clone)]
pub struct Player {
    /// 位置（スプライト座標、描画時に拡大率が掛かる）
    pub position: Vector2<f32>,
    /// 1秒あたりの移動量
    pub speed: f32,
    pub sprite: u32,
    pub bounds: Option<Bounds>,
}

impl Player {
    pub const DEFAULT_SPEED: f32 = 64.0;

    pub fn new(position: Vector2<f32>, sprite: u32) -> Self {
        Self {
            position,
            speed: Self::DEFAULT_SPEED,
            sprite,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// 押されている移動操作の方向へ dt 秒分だけ進む。
    pub fn update(&mut self, input: &InputHandler, dt: f32) {
        let mut direction = Vector2::zero();
        if input.is_action_down(Action::Left) {
            direction.x -= 1.0;
        }
        if input.is_action_down(Action::Right) {
            direction.x += 1.0;
        }
        if input.is_action_down(Action::Up) {
            direction.y -= 1.0;
        }
        if input.is_action_down(Action::Down) {
            direction.y += 1.0;
        }
        if direction.is_zero() {
            return;
        }

        // 斜め移動が速くならないよう正規化
        self.position += direction.normalize() * self.speed * dt;

        if let Some(bounds) = self.bounds {
            self.position.x = self.position.x.clamp(bounds.min.x, bounds.max.x);
            self.position.y = self.position.y.clamp(bounds.min.y, bounds.max.y);
        }
    }

    pub fn render<C: Canvas>(&self, sheet: &Spritesheet<C::Texture>, canvas: &mut C) -> Result<()> {
        sheet.sprite_scaled(canvas, self.sprite, self.position.x, self.position.y)
    }
}
