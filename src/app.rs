// src/app.rs

use std::time::Instant;

use cgmath::{Vector2, Zero};
use log::{error, info};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;

use crate::asset_manager::AssetManager;
use crate::config::GameConfig;
use crate::context::GameContext;
use crate::error::Result;
use crate::game_loop::FrameLoop;
use crate::graphics::{ContextSlot, GraphicsContext};
use crate::player::{Bounds, Player};
use crate::renderer::Renderer;
use crate::spritesheet::Spritesheet;
use crate::state::{GameState, StateDispatcher, TitleScene};

/// run 関数
///
/// 設定を検証し、ウィンドウとレンダラーを初期化してからゲームループを回す。
/// 初期化に失敗した場合はループを開始せずにエラーを返す。
/// どの経路で抜けても、アセット → レンダラー → ウィンドウの順に解放される。
pub fn run(config: GameConfig) -> Result<()> {
    config.validate()?;

    let mut event_loop = EventLoop::new();
    let mut graphics = ContextSlot::new();
    let mut assets: AssetManager = AssetManager::new(config.assets.resolve_root());
    info!("asset root: {}", assets.root().display());

    let gfx = graphics.init_with(|| GraphicsContext::init(&event_loop, &config))?;
    let result = run_loaded(&mut event_loop, gfx, &mut assets, &config);

    assets.clear();
    graphics.quit();
    info!("shutdown complete");
    result
}

fn run_loaded(
    event_loop: &mut EventLoop<()>,
    gfx: &mut GraphicsContext,
    assets: &mut AssetManager,
    config: &GameConfig,
) -> Result<()> {
    let texture = assets.load_texture(&gfx.renderer, &config.assets.spritesheet)?;
    let spritesheet = Spritesheet::new(
        texture,
        config.assets.sprite_size,
        config.assets.sprites_per_row,
        config.assets.sprite_scale,
    )?;
    info!(
        "spritesheet loaded: {} sprites ({}x{})",
        spritesheet.sprite_count(),
        spritesheet.columns(),
        spritesheet.rows()
    );

    let mut ctx = GameContext::new(spritesheet, spawn_player(config));
    let mut states: StateDispatcher<Renderer> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TitleScene));

    let mut frame_loop = FrameLoop::new(Instant::now()).with_frame_limit(config.frame_limit);
    let window_id = gfx.window.id();
    let mut outcome = Ok(());

    event_loop.run_return(|event, _, control_flow| {
        match event {
            Event::WindowEvent { window_id: id, event } if id == window_id => {
                match &event {
                    WindowEvent::Resized(size) => gfx.renderer.resize(*size, config),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        gfx.renderer.resize(**new_inner_size, config)
                    }
                    _ => {}
                }
                frame_loop.handle_event(&event, &mut ctx.input);
            }
            // 溜まったイベントを全て処理し終えてから1フレーム進める
            Event::MainEventsCleared => {
                let now = Instant::now();
                if let Some(deadline) = frame_loop.wait_deadline(now) {
                    *control_flow = ControlFlow::WaitUntil(deadline);
                } else {
                    *control_flow = ControlFlow::Poll;
                    if let Err(err) = frame_loop.run_frame(now, &mut states, &mut ctx, &mut gfx.renderer) {
                        error!("frame failed: {}", err);
                        outcome = Err(err);
                        frame_loop.request_quit();
                    }
                }
            }
            _ => {}
        }

        if !frame_loop.is_running() {
            *control_flow = ControlFlow::Exit;
        }
    });

    info!("main loop finished after {} frames", frame_loop.frames());
    outcome
}

/// 論理画面の中央にプレイヤーを置き、画面内に収まるよう移動範囲を設定する。
fn spawn_player(config: &GameConfig) -> Player {
    let scale = config.assets.sprite_scale;
    let size = config.assets.sprite_size as f32;
    let max = Vector2::new(
        (config.logical_width as f32 / scale - size).max(0.0),
        (config.logical_height as f32 / scale - size).max(0.0),
    );
    Player::new(max / 2.0, 0).with_bounds(Bounds {
        min: Vector2::zero(),
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_spawns_centered_inside_screen() {
        let config = GameConfig::default();
        let player = spawn_player(&config);
        let bounds = player.bounds.unwrap();

        // 960x540 を 4 倍で表示すると 240x135、16px のスプライトが収まる範囲
        assert_eq!(bounds.max, Vector2::new(224.0, 119.0));
        assert_eq!(player.position, Vector2::new(112.0, 59.5));
    }

    #[test]
    fn invalid_config_fails_before_any_window() {
        let mut config = GameConfig::default();
        config.assets.sprite_size = 0;
        assert!(run(config).is_err());
    }
}
