// src/lib.rs
pub mod app;
pub mod asset_manager;
pub mod canvas;
pub mod config;
pub mod context;
pub mod error;
pub mod game_loop;
pub mod graphics;
pub mod input;
pub mod logger;
pub mod particles;
pub mod player;
pub mod renderer;
pub mod spritesheet;
pub mod state;

pub use app::run;
pub use asset_manager::AssetManager;
pub use canvas::{Canvas, Rect, SourceRect, Texture};
pub use config::{AssetConfig, GameConfig};
pub use context::GameContext;
pub use error::{GameError, Result};
pub use game_loop::{FrameLoop, LoopState};
pub use graphics::GraphicsContext;
pub use input::{Action, InputHandler};
pub use logger::{init_logger_with_config, LoggerConfig};
pub use renderer::Renderer;
pub use spritesheet::Spritesheet;
pub use state::{GameState, Scene, StateDispatcher};
