// src/state.rs

use std::collections::HashMap;

use log::{debug, info};

use crate::canvas::Canvas;
use crate::context::GameContext;
use crate::error::Result;

/// 現在のゲーム状態。どのシーンの update / render が呼ばれるかを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    MenuTitle,
    Gameplay,
}

/// ゲーム状態ごとの処理を定義するトレイト。
pub trait Scene<C: Canvas> {
    /// 毎フレームの更新処理。
    fn update(&mut self, ctx: &mut GameContext<C::Texture>, dt: f32);
    /// 毎フレームの描画処理。
    fn render(&self, ctx: &GameContext<C::Texture>, canvas: &mut C) -> Result<()>;
}

/// 現在のゲーム状態に対応するシーンへ update / render を振り分ける。
/// シーンが登録されていない状態では何もしない。
pub struct StateDispatcher<C: Canvas> {
    current: GameState,
    scenes: HashMap<GameState, Box<dyn Scene<C>>>,
}

impl<C: Canvas> StateDispatcher<C> {
    pub fn new(initial: GameState) -> Self {
        Self {
            current: initial,
            scenes: HashMap::new(),
        }
    }

    /// 状態にシーンを登録する。既存の登録は置き換えられる。
    pub fn register(&mut self, state: GameState, scene: Box<dyn Scene<C>>) {
        if self.scenes.insert(state, scene).is_some() {
            debug!("scene for {:?} replaced", state);
        }
    }

    pub fn current(&self) -> GameState {
        self.current
    }

    pub fn set_state(&mut self, state: GameState) {
        if state != self.current {
            info!("game state {:?} -> {:?}", self.current, state);
            self.current = state;
        }
    }

    pub fn update(&mut self, ctx: &mut GameContext<C::Texture>, dt: f32) {
        if let Some(scene) = self.scenes.get_mut(&self.current) {
            scene.update(ctx, dt);
        }
    }

    pub fn render(&self, ctx: &GameContext<C::Texture>, canvas: &mut C) -> Result<()> {
        match self.scenes.get(&self.current) {
            Some(scene) => scene.render(ctx, canvas),
            None => Ok(()),
        }
    }
}

/// タイトルメニュー。今はプレイヤーとパーティクルをそのまま動かして描くだけ。
#[derive(Debug, Default)]
pub struct TitleScene;

impl<C: Canvas> Scene<C> for TitleScene {
    fn update(&mut self, ctx: &mut GameContext<C::Texture>, dt: f32) {
        ctx.player.update(&ctx.input, dt);
        ctx.particles.update(dt);
    }

    fn render(&self, ctx: &GameContext<C::Texture>, canvas: &mut C) -> Result<()> {
        ctx.particles.render(&ctx.spritesheet, canvas)?;
        ctx.player.render(&ctx.spritesheet, canvas)
    }
}
