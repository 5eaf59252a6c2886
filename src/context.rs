// src/context.rs

use crate::input::InputHandler;
use crate::particles::ParticleHandler;
use crate::player::Player;
use crate::spritesheet::Spritesheet;

/// ゲームループとシーンに参照で渡されるゲーム全体の状態。
/// エントリーポイントが所有し、プロセスの終了まで生存する。
pub struct GameContext<T> {
    pub input: InputHandler,
    pub particles: ParticleHandler,
    pub player: Player,
    pub spritesheet: Spritesheet<T>,
}

impl<T> GameContext<T> {
    pub fn new(spritesheet: Spritesheet<T>, player: Player) -> Self {
        Self {
            input: InputHandler::new(),
            particles: ParticleHandler::new(),
            player,
            spritesheet,
        }
    }
}
