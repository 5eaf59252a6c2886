// src/particles.rs

use cgmath::Vector2;

use crate::canvas::Canvas;
use crate::error::Result;
use crate::spritesheet::Spritesheet;

/// 一定時間だけ表示されるスプライト。
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vector2<f32>,
    /// 1秒あたりの移動量（スプライト座標）
    pub velocity: Vector2<f32>,
    /// 残り寿命（秒）
    pub lifetime: f32,
    pub sprite: u32,
}

impl Particle {
    pub fn new(position: Vector2<f32>, velocity: Vector2<f32>, lifetime: f32, sprite: u32) -> Self {
        Self {
            position,
            velocity,
            lifetime,
            sprite,
        }
    }

    /// 寿命を減らして移動する。寿命が尽きたら false を返す。
    fn tick(&mut self, dt: f32) -> bool {
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            return false;
        }
        self.position += self.velocity * dt;
        true
    }
}

/// 一時的なスプライトエフェクトの管理。
#[derive(Debug, Default)]
pub struct ParticleHandler {
    particles: Vec<Particle>,
}

impl ParticleHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// 全パーティクルを進め、寿命切れのものを取り除く。
    pub fn update(&mut self, dt: f32) {
        self.particles.retain_mut(|p| p.tick(dt));
    }

    pub fn render<C: Canvas>(&self, sheet: &Spritesheet<C::Texture>, canvas: &mut C) -> Result<()> {
        for p in &self.particles {
            sheet.sprite_scaled(canvas, p.sprite, p.position.x, p.position.y)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}
