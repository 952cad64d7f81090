//! Input events from the host and the navigation actions they map to.

pub mod dispatch;

use crate::types::{ScrollExtremes, UiMode};

pub use dispatch::dispatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Tap at horizontal offset `x` within a viewport `viewport_width` wide.
    Tap { x: f32, viewport_width: f32 },
    Swipe(SwipeDirection),
    /// Key press using DOM key names (`ArrowLeft`, `ArrowRight`, ...).
    Key { key: String, modifiers: Modifiers, text_input_focused: bool },
}

impl InputEvent {
    pub fn tap(x: f32, viewport_width: f32) -> Self {
        Self::Tap { x, viewport_width }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key { key: key.into(), modifiers: Modifiers::default(), text_input_focused: false }
    }
}

/// Reader state the dispatcher needs to resolve an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavContext {
    pub mode: UiMode,
    pub has_prev_chapter: bool,
    pub has_next_chapter: bool,
    pub scroll: ScrollExtremes,
    pub controls_visible: bool,
    pub viewport_height: f32,
}

/// What the reader should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    /// Scroll the continuous view by this many pixels; negative is upwards.
    ScrollBy(f32),
    PrevPage,
    NextPage,
    PrevChapter,
    NextChapter,
    ToggleControls,
    HideControls,
}
