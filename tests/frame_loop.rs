use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cgmath::Vector2;
use pair_of_squares::player::Player;
use pair_of_squares::state::TitleScene;
use pair_of_squares::{
    Action, Canvas, FrameLoop, GameContext, GameError, GameState, LoopState, Rect, Result, Scene,
    SourceRect, Spritesheet, StateDispatcher, Texture,
};
use winit::event::{VirtualKeyCode, WindowEvent};

struct SheetTexture;

impl Texture for SheetTexture {
    fn size(&self) -> (u32, u32) {
        (64, 64)
    }
}

/// 呼び出し順を記録するキャンバス。
#[derive(Default)]
struct TraceCanvas {
    trace: Rc<RefCell<Vec<String>>>,
}

impl Canvas for TraceCanvas {
    type Texture = SheetTexture;

    fn clear(&mut self) {
        self.trace.borrow_mut().push("clear".into());
    }

    fn blit(&mut self, _texture: &Rc<SheetTexture>, src: SourceRect, _dst: Rect) {
        self.trace.borrow_mut().push(format!("blit {},{}", src.x, src.y));
    }

    fn present(&mut self) -> Result<()> {
        self.trace.borrow_mut().push("present".into());
        Ok(())
    }
}

/// update / render の呼び出しを記録し、Confirm が押された瞬間も記録するシーン。
struct TraceScene {
    trace: Rc<RefCell<Vec<String>>>,
}

impl Scene<TraceCanvas> for TraceScene {
    fn update(&mut self, ctx: &mut GameContext<SheetTexture>, _dt: f32) {
        let entry = if ctx.input.is_action_pressed(Action::Confirm) {
            "update confirm"
        } else {
            "update"
        };
        self.trace.borrow_mut().push(entry.into());
    }

    fn render(&self, _ctx: &GameContext<SheetTexture>, _canvas: &mut TraceCanvas) -> Result<()> {
        self.trace.borrow_mut().push("render".into());
        Ok(())
    }
}

fn context() -> GameContext<SheetTexture> {
    let sheet = Spritesheet::new(Rc::new(SheetTexture), 16, 4, 1.0).unwrap();
    GameContext::new(sheet, Player::new(Vector2::new(0.0, 0.0), 0))
}

#[test]
fn frame_runs_update_clear_render_present_in_order() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TraceScene { trace: Rc::clone(&trace) }));
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    assert!(frame_loop
        .run_frame(start + Duration::from_millis(16), &mut states, &mut ctx, &mut canvas)
        .unwrap());

    assert_eq!(*trace.borrow(), vec!["update", "clear", "render", "present"]);
    assert_eq!(frame_loop.frames(), 1);
}

#[test]
fn no_frames_after_close_requested() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TraceScene { trace: Rc::clone(&trace) }));
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    frame_loop.run_frame(start, &mut states, &mut ctx, &mut canvas).unwrap();

    frame_loop.handle_event(&WindowEvent::CloseRequested, &mut ctx.input);
    assert_eq!(frame_loop.state(), LoopState::QuitRequested);

    let before = trace.borrow().len();
    for i in 1..5 {
        let ran = frame_loop
            .run_frame(start + Duration::from_millis(16 * i), &mut states, &mut ctx, &mut canvas)
            .unwrap();
        assert!(!ran);
    }
    assert_eq!(trace.borrow().len(), before);
    assert_eq!(frame_loop.frames(), 1);
}

#[test]
fn pressed_edge_is_seen_by_exactly_one_frame() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TraceScene { trace: Rc::clone(&trace) }));
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    ctx.input.press_key(VirtualKeyCode::Return);
    frame_loop.run_frame(start, &mut states, &mut ctx, &mut canvas).unwrap();
    frame_loop.run_frame(start, &mut states, &mut ctx, &mut canvas).unwrap();

    let updates: Vec<String> = trace
        .borrow()
        .iter()
        .filter(|entry| entry.starts_with("update"))
        .cloned()
        .collect();
    assert_eq!(updates, vec!["update confirm", "update"]);
    assert!(ctx.input.is_action_down(Action::Confirm));
}

#[test]
fn unregistered_state_clears_and_presents_only() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::Gameplay);
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    frame_loop.run_frame(start, &mut states, &mut ctx, &mut canvas).unwrap();
    assert_eq!(*trace.borrow(), vec!["clear", "present"]);
}

#[test]
fn title_scene_draws_player_sprite() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TitleScene));
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();
    ctx.player.sprite = 5;

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    frame_loop.run_frame(start, &mut states, &mut ctx, &mut canvas).unwrap();
    assert_eq!(*trace.borrow(), vec!["clear", "blit 16,16", "present"]);
}

#[test]
fn out_of_range_sprite_fails_the_frame() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let mut states: StateDispatcher<TraceCanvas> = StateDispatcher::new(GameState::MenuTitle);
    states.register(GameState::MenuTitle, Box::new(TitleScene));
    let mut canvas = TraceCanvas { trace: Rc::clone(&trace) };
    let mut ctx = context();
    // 64x64 のシートには 16 枚しかない
    ctx.player.sprite = 16;

    let start = Instant::now();
    let mut frame_loop = FrameLoop::new(start);
    let err = frame_loop
        .run_frame(start, &mut states, &mut ctx, &mut canvas)
        .unwrap_err();
    assert!(matches!(err, GameError::SpriteIndexOutOfRange { index: 16, count: 16 }));
    assert!(!trace.borrow().contains(&"present".to_string()));
}
