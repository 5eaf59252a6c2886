// src/graphics.rs

use log::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::event_loop::EventLoopWindowTarget;
use winit::window::{Window, WindowBuilder};

use crate::asset_manager::{check_image_support, REQUIRED_IMAGE_FORMATS};
use crate::config::GameConfig;
use crate::error::Result;
use crate::renderer::Renderer;

/// 明示的な後始末を持つリソース。
pub trait Teardown {
    fn teardown(self);
}

/// ウィンドウとレンダラーの組。
/// フィールドの宣言順により、レンダラーは必ずウィンドウより先に破棄される。
pub struct GraphicsContext {
    pub renderer: Renderer,
    pub window: Window,
}

impl GraphicsContext {
    /// 画像デコーダを確認してから、固定タイトル・解像度のウィンドウとレンダラーを作る。
    pub fn init<T: 'static>(event_loop: &EventLoopWindowTarget<T>, config: &GameConfig) -> Result<Self> {
        check_image_support(&REQUIRED_IMAGE_FORMATS)?;

        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
            .with_resizable(config.resizable)
            .build(event_loop)?;

        let renderer = pollster::block_on(Renderer::new(&window, config))?;
        info!(target: "graphics", "window \"{}\" created ({}x{})", config.title, config.window_width, config.window_height);
        Ok(Self { renderer, window })
    }
}

impl Teardown for GraphicsContext {
    fn teardown(self) {
        let GraphicsContext { renderer, window } = self;
        drop(renderer);
        debug!(target: "graphics", "renderer destroyed");
        drop(window);
        debug!(target: "graphics", "window destroyed");
    }
}

/// 生存中のコンテキストを高々1つだけ保持する。
/// 再初期化の前には必ず古いコンテキストを破棄する。
pub struct ContextSlot<T: Teardown> {
    inner: Option<T>,
}

impl<T: Teardown> Default for ContextSlot<T> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<T: Teardown> ContextSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存のコンテキストを破棄してから `init` で新しく作る。
    /// 失敗した場合スロットは空のまま。
    pub fn init_with<F>(&mut self, init: F) -> Result<&mut T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.inner.is_some() {
            warn!("context initialised twice, tearing down the previous one first");
            self.quit();
        }
        Ok(self.inner.insert(init()?))
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    /// コンテキストを破棄する。何度呼んでもよい。
    pub fn quit(&mut self) {
        if let Some(context) = self.inner.take() {
            context.teardown();
        }
    }
}

impl<T: Teardown> Drop for ContextSlot<T> {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// 生成と破棄をログに記録するダミーコンテキスト。
    struct Tracked {
        id: u32,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Teardown for Tracked {
        fn teardown(self) {
            self.log.borrow_mut().push(format!("teardown {}", self.id));
        }
    }

    fn create(id: u32, log: &Rc<RefCell<Vec<String>>>) -> Result<Tracked> {
        log.borrow_mut().push(format!("init {}", id));
        Ok(Tracked { id, log: Rc::clone(log) })
    }

    #[test]
    fn reinit_tears_down_previous_context_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = ContextSlot::new();
        slot.init_with(|| create(1, &log)).unwrap();
        slot.init_with(|| create(2, &log)).unwrap();

        assert_eq!(slot.get().map(|c| c.id), Some(2));
        assert_eq!(*log.borrow(), vec!["init 1", "teardown 1", "init 2"]);
    }

    #[test]
    fn quit_is_idempotent_and_runs_on_drop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut slot = ContextSlot::new();
            slot.init_with(|| create(1, &log)).unwrap();
            slot.quit();
            slot.quit();
            assert!(!slot.is_live());
            slot.init_with(|| create(2, &log)).unwrap();
        }
        assert_eq!(*log.borrow(), vec!["init 1", "teardown 1", "init 2", "teardown 2"]);
    }

    #[test]
    fn failed_init_leaves_slot_empty() {
        let mut slot: ContextSlot<Tracked> = ContextSlot::new();
        assert!(slot.init_with(|| Err(GameError::NoAdapter)).is_err());
        assert!(!slot.is_live());
    }
}
