// src/input.rs

use std::collections::{HashMap, HashSet};

use log::trace;
use winit::event::{ElementState, MouseButton, VirtualKeyCode, WindowEvent};

/// ゲーム側が参照する論理的な操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Cancel,
}

impl Action {
    /// 操作ごとのデフォルトのキー割り当て。
    pub fn default_keys(self) -> &'static [VirtualKeyCode] {
        use VirtualKeyCode::*;
        match self {
            Action::Up => &[W, Up],
            Action::Down => &[S, Down],
            Action::Left => &[A, Left],
            Action::Right => &[D, Right],
            Action::Confirm => &[Return, Space],
            Action::Cancel => &[Escape],
        }
    }

    pub const ALL: [Action; 6] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Confirm,
        Action::Cancel,
    ];
}

/// 入力状態を保持する構造体。
///
/// 押下中のキーはフレームをまたいで保持される。押された／離された瞬間の
/// エッジ情報は `update` を呼ぶまで残り、1フレームの更新・描画からのみ見える。
#[derive(Debug)]
pub struct InputHandler {
    bindings: HashMap<Action, Vec<VirtualKeyCode>>,
    /// 現在押されているキー
    keys_down: HashSet<VirtualKeyCode>,
    /// このフレームで押されたキー
    keys_pressed: HashSet<VirtualKeyCode>,
    /// このフレームで離されたキー
    keys_released: HashSet<VirtualKeyCode>,
    /// 現在押されているマウスボタン
    mouse_buttons: HashSet<MouseButton>,
    /// カーソルの現在位置（ウィンドウ座標）
    cursor_position: Option<(f64, f64)>,
}

impl Default for InputHandler {
    fn default() -> Self {
        let bindings = Action::ALL
            .iter()
            .map(|&action| (action, action.default_keys().to_vec()))
            .collect();
        Self {
            bindings,
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            keys_released: HashSet::new(),
            mouse_buttons: HashSet::new(),
            cursor_position: None,
        }
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// フレームの終わりに呼び、押された／離されたエッジ情報をリセットする。
    pub fn update(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    /// ウィンドウイベントに基づき入力状態を更新する。
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { input, .. } => {
                if let Some(key) = input.virtual_keycode {
                    match input.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Some((position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_position = None;
            }
            // フォーカスを失うと KeyUp が届かないので全て離したことにする
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    /// キーが押されたことを記録する。キーリピートではエッジを立てない。
    pub fn press_key(&mut self, key: VirtualKeyCode) {
        if self.keys_down.insert(key) {
            trace!("key pressed: {:?}", key);
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: VirtualKeyCode) {
        if self.keys_down.remove(&key) {
            trace!("key released: {:?}", key);
            self.keys_released.insert(key);
        }
    }

    /// 押下中の全キーとボタンを離したことにする。
    pub fn release_all(&mut self) {
        let held: Vec<_> = self.keys_down.iter().copied().collect();
        for key in held {
            self.release_key(key);
        }
        self.mouse_buttons.clear();
    }

    /// 操作に割り当てるキーを追加する。
    pub fn bind(&mut self, action: Action, key: VirtualKeyCode) {
        let keys = self.bindings.entry(action).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// 操作のキー割り当てを全て外す。
    pub fn unbind_all(&mut self, action: Action) {
        self.bindings.remove(&action);
    }

    pub fn is_key_down(&self, key: VirtualKeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_key_pressed(&self, key: VirtualKeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: VirtualKeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// 操作に割り当てられたキーのどれかが押されていれば true。
    pub fn is_action_down(&self, action: Action) -> bool {
        self.any_bound(action, |key| self.is_key_down(key))
    }

    /// このフレームで操作が開始された（割り当てキーが押された）なら true。
    pub fn is_action_pressed(&self, action: Action) -> bool {
        self.any_bound(action, |key| self.is_key_pressed(key))
    }

    pub fn is_action_released(&self, action: Action) -> bool {
        self.any_bound(action, |key| self.is_key_released(key))
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn cursor_position(&self) -> Option<(f64, f64)> {
        self.cursor_position
    }

    fn any_bound(&self, action: Action, query: impl Fn(VirtualKeyCode) -> bool) -> bool {
        self.bindings
            .get(&action)
            .map_or(false, |keys| keys.iter().any(|&key| query(key)))
    }
}
