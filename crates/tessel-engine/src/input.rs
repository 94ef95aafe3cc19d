//! Event sources feeding the run loop.
//!
//! Each frame the loop calls [`InputSource::poll`] once and dispatches the
//! returned batch in order. Windowed hosts translate platform events into
//! [`InputEvent`]s; headless runs use [`ScriptedInput`]. Hosts that produce
//! events on other threads push them through an [`InputSender`] into a
//! [`SharedInputQueue`], which is the only engine-facing state those threads
//! touch.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tessel_scene::event::InputEvent;

use crate::error::{EngineError, EngineResult};

/// Something that yields the ordered event batch for each frame.
pub trait InputSource {
    /// Events since the previous poll, oldest first.
    fn poll(&mut self) -> Vec<InputEvent>;
}

// ---------------------------------------------------------------------------
// ScriptedInput
// ---------------------------------------------------------------------------

/// Pre-recorded per-frame event batches.
///
/// Frame `n` receives batch `n`; once the script runs out, frames receive
/// nothing, or a quit event if [`then_quit`](Self::then_quit) was set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<InputEvent>>,
    quit_when_exhausted: bool,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = Vec<InputEvent>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            quit_when_exhausted: false,
        }
    }

    /// `count` frames without any events.
    pub fn idle(count: usize) -> Self {
        Self::new(std::iter::repeat_with(Vec::new).take(count))
    }

    /// Emit a quit event once the script is exhausted.
    pub fn then_quit(mut self) -> Self {
        self.quit_when_exhausted = true;
        self
    }

    /// Parse a JSON array of per-frame event arrays.
    ///
    /// ```
    /// use tessel_engine::input::{InputSource, ScriptedInput};
    ///
    /// let mut input = ScriptedInput::from_json_str(
    ///     r#"[[{"category":"key_down","key":"space"}], [], [{"category":"quit"}]]"#,
    /// ).unwrap();
    /// assert_eq!(input.remaining(), 3);
    /// assert!(input.poll()[0].is_key_down("space"));
    /// ```
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if the JSON does not match.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let frames: Vec<Vec<InputEvent>> = serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid input script: {e}")))?;
        Ok(Self::new(frames))
    }

    /// Append one frame's batch.
    pub fn push_frame(&mut self, events: Vec<InputEvent>) {
        self.frames.push_back(events);
    }

    /// Batches not yet polled.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        match self.frames.pop_front() {
            Some(batch) => batch,
            None if self.quit_when_exhausted => vec![InputEvent::quit()],
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SharedInputQueue
// ---------------------------------------------------------------------------

type Queue = Arc<Mutex<VecDeque<InputEvent>>>;

fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<InputEvent>> {
    // Poisoning is ignored: the queue only holds plain data.
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock-guarded FIFO that other threads feed through [`InputSender`]s.
#[derive(Debug, Clone, Default)]
pub struct SharedInputQueue {
    queue: Queue,
}

impl SharedInputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that can be moved to another thread.
    pub fn sender(&self) -> InputSender {
        InputSender {
            queue: Arc::clone(&self.queue),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }
}

impl InputSource for SharedInputQueue {
    fn poll(&mut self) -> Vec<InputEvent> {
        lock(&self.queue).drain(..).collect()
    }
}

/// Producer side of a [`SharedInputQueue`].
#[derive(Debug, Clone)]
pub struct InputSender {
    queue: Queue,
}

impl InputSender {
    /// Queue `event` for the next poll.
    pub fn send(&self, event: InputEvent) {
        lock(&self.queue).push_back(event);
    }

    pub fn send_all(&self, events: impl IntoIterator<Item = InputEvent>) {
        lock(&self.queue).extend(events);
    }
}
