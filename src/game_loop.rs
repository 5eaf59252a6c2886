// src/game_loop.rs

use std::time::{Duration, Instant};

use log::{debug, info};
use winit::event::WindowEvent;

use crate::canvas::Canvas;
use crate::context::GameContext;
use crate::error::Result;
use crate::input::InputHandler;
use crate::state::StateDispatcher;

/// ループの状態。QuitRequested になったら二度と Running には戻らない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    QuitRequested,
}

/// 前フレームからの経過時間を秒で返すタイマー。
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    last: Instant,
}

impl FrameTimer {
    pub fn new(now: Instant) -> Self {
        Self { last: now }
    }

    /// 経過時間を返して基準時刻を進める。時刻が巻き戻っても負にはならない。
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last);
        self.last = self.last.max(now);
        dt.as_secs_f32()
    }
}

/// 1秒ごとに FPS をデバッグログに出す。
#[derive(Debug, Default)]
pub struct FpsCounter {
    elapsed: f32,
    frames: u32,
}

impl FpsCounter {
    /// フレームを数え、1秒経過していればその間の FPS を返す。
    pub fn record(&mut self, dt: f32) -> Option<f32> {
        self.elapsed += dt;
        self.frames += 1;
        if self.elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.elapsed = 0.0;
        self.frames = 0;
        Some(fps)
    }
}

/// イベント処理 → 更新 → クリア → 描画 → 表示 を1フレームとして回す。
pub struct FrameLoop {
    state: LoopState,
    timer: FrameTimer,
    fps: FpsCounter,
    frame_interval: Option<Duration>,
    last_frame: Instant,
    frames: u64,
}

impl FrameLoop {
    pub fn new(now: Instant) -> Self {
        Self {
            state: LoopState::Running,
            timer: FrameTimer::new(now),
            fps: FpsCounter::default(),
            frame_interval: None,
            last_frame: now,
            frames: 0,
        }
    }

    /// FPS 上限を設定する。None ならフレームレート制限なし。
    pub fn with_frame_limit(mut self, fps: Option<u32>) -> Self {
        self.frame_interval = fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)));
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// 実行したフレーム数。
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 終了を要求する。状態が遷移したときだけ true を返す。
    pub fn request_quit(&mut self) -> bool {
        if self.state == LoopState::QuitRequested {
            return false;
        }
        info!("quit requested after {} frames", self.frames);
        self.state = LoopState::QuitRequested;
        true
    }

    /// ウィンドウイベントを振り分ける。閉じる要求は終了へ、それ以外は入力処理へ渡す。
    pub fn handle_event(&mut self, event: &WindowEvent, input: &mut InputHandler) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.request_quit();
            }
            other => input.handle_window_event(other),
        }
    }

    /// FPS 上限があり、まだ次のフレームの時刻でなければ待つべき時刻を返す。
    pub fn wait_deadline(&self, now: Instant) -> Option<Instant> {
        let interval = self.frame_interval?;
        let due = self.last_frame + interval;
        (now < due).then_some(due)
    }

    /// 1フレームを実行する。終了要求後は何もせず false を返す。
    pub fn run_frame<C: Canvas>(
        &mut self,
        now: Instant,
        states: &mut StateDispatcher<C>,
        ctx: &mut GameContext<C::Texture>,
        canvas: &mut C,
    ) -> Result<bool> {
        if !self.is_running() {
            return Ok(false);
        }

        let dt = self.timer.tick(now);
        self.last_frame = now;

        states.update(ctx, dt);
        canvas.clear();
        states.render(ctx, canvas)?;
        canvas.present()?;

        // このフレームのエッジ情報は次のイベント処理の前に消す
        ctx.input.update();

        self.frames += 1;
        if let Some(fps) = self.fps.record(dt) {
            debug!(target: "frame", "fps: {:.1}", fps);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_never_goes_negative() {
        let start = Instant::now();
        let mut timer = FrameTimer::new(start + Duration::from_millis(50));
        assert_eq!(timer.tick(start), 0.0);

        let dt = timer.tick(start + Duration::from_millis(150));
        assert!((dt - 0.1).abs() < 1e-6);
    }

    #[test]
    fn timer_measures_seconds() {
        let start = Instant::now();
        let mut timer = FrameTimer::new(start);
        let dt = timer.tick(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
        assert_eq!(timer.tick(start + Duration::from_millis(16)), 0.0);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..59 {
            assert!(counter.record(1.0 / 60.0).is_none());
        }
        let fps = counter.record(1.0 / 60.0 + 0.001).unwrap();
        assert!((fps - 60.0).abs() < 0.1);
    }

    #[test]
    fn quit_transition_happens_once() {
        let mut frame_loop = FrameLoop::new(Instant::now());
        assert!(frame_loop.is_running());
        assert!(frame_loop.request_quit());
        assert!(!frame_loop.request_quit());
        assert_eq!(frame_loop.state(), LoopState::QuitRequested);
    }

    #[test]
    fn close_event_requests_quit() {
        let mut frame_loop = FrameLoop::new(Instant::now());
        let mut input = InputHandler::new();
        frame_loop.handle_event(&WindowEvent::Focused(true), &mut input);
        assert!(frame_loop.is_running());

        frame_loop.handle_event(&WindowEvent::CloseRequested, &mut input);
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn frame_limit_sets_deadline() {
        let start = Instant::now();
        let frame_loop = FrameLoop::new(start).with_frame_limit(Some(50));
        let due = frame_loop.wait_deadline(start + Duration::from_millis(5)).unwrap();
        assert_eq!(due, start + Duration::from_millis(20));
        assert!(frame_loop.wait_deadline(start + Duration::from_millis(25)).is_none());

        let unlimited = FrameLoop::new(start);
        assert!(unlimited.wait_deadline(start).is_none());
    }
}
