//! Pure mapping from input events to reader actions.

use crate::config::EngineConfig;
use crate::settings::{EdgeTapBehavior, ReaderSettings, SwipeGesture};
use crate::types::UiMode;

use super::{Action, InputEvent, NavContext, SwipeDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Back,
    Forward,
}

/// Resolve an input event to an action. Pure: the caller applies the result.
pub fn dispatch(settings: &ReaderSettings, config: &EngineConfig, ctx: &NavContext, event: &InputEvent) -> Action {
    match event {
        InputEvent::Tap { x, viewport_width } => tap(settings, config, ctx, *x, *viewport_width),
        InputEvent::Swipe(direction) => {
            let gesture = match direction {
                SwipeDirection::Left => settings.swipe_left_gesture,
                SwipeDirection::Right => settings.swipe_right_gesture,
            };
            match gesture {
                SwipeGesture::None => Action::None,
                SwipeGesture::PrevChapter => travel(ctx, Heading::Back),
                SwipeGesture::NextChapter => travel(ctx, Heading::Forward),
            }
        }
        InputEvent::Key { key, modifiers, text_input_focused } => {
            if !settings.keyboard_navigation || modifiers.any() || *text_input_focused || ctx.controls_visible {
                return Action::None;
            }
            match key.as_str() {
                "ArrowLeft" => chapter(ctx, Heading::Back),
                "ArrowRight" => chapter(ctx, Heading::Forward),
                _ => Action::None,
            }
        }
    }
}

fn tap(settings: &ReaderSettings, config: &EngineConfig, ctx: &NavContext, x: f32, width: f32) -> Action {
    if ctx.controls_visible {
        return Action::HideControls;
    }
    let edge = width * config.edge_tap_width_percent / 100.0;
    let (behavior, heading) = if x <= edge {
        (settings.left_edge_tap_behavior, Heading::Back)
    } else if x >= width - edge {
        (settings.right_edge_tap_behavior, Heading::Forward)
    } else {
        return Action::ToggleControls;
    };

    match behavior {
        EdgeTapBehavior::None => Action::None,
        EdgeTapBehavior::ScrollUp => scroll(config, ctx, Heading::Back),
        EdgeTapBehavior::ScrollDown => scroll(config, ctx, Heading::Forward),
        EdgeTapBehavior::Chapter => travel(ctx, heading),
    }
}

/// Continuous: scroll a step unless pinned at that end. Paged: turn a page unless at the boundary.
fn scroll(config: &EngineConfig, ctx: &NavContext, heading: Heading) -> Action {
    match (ctx.mode, heading) {
        (UiMode::Continuous, Heading::Back) if ctx.scroll.at_top => Action::None,
        (UiMode::Continuous, Heading::Forward) if ctx.scroll.at_bottom => Action::None,
        (UiMode::Continuous, Heading::Back) => Action::ScrollBy(-config.scroll_step_ratio * ctx.viewport_height),
        (UiMode::Continuous, Heading::Forward) => Action::ScrollBy(config.scroll_step_ratio * ctx.viewport_height),
        (UiMode::Paged(cursor), Heading::Back) if !cursor.is_first() => Action::PrevPage,
        (UiMode::Paged(cursor), Heading::Forward) if !cursor.is_last() => Action::NextPage,
        (UiMode::Paged(_), _) => Action::None,
    }
}

/// Page turn first in paged mode, chapter navigation once the chapter boundary is reached.
fn travel(ctx: &NavContext, heading: Heading) -> Action {
    if let UiMode::Paged(cursor) = ctx.mode {
        match heading {
            Heading::Back if !cursor.is_first() => return Action::PrevPage,
            Heading::Forward if !cursor.is_last() => return Action::NextPage,
            _ => {}
        }
    }
    chapter(ctx, heading)
}

fn chapter(ctx: &NavContext, heading: Heading) -> Action {
    match heading {
        Heading::Back if ctx.has_prev_chapter => Action::PrevChapter,
        Heading::Forward if ctx.has_next_chapter => Action::NextChapter,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::types::{PageCursor, ScrollExtremes};

    fn continuous() -> NavContext {
        NavContext {
            mode: UiMode::Continuous,
            has_prev_chapter: true,
            has_next_chapter: true,
            scroll: ScrollExtremes { at_top: false, at_bottom: false },
            controls_visible: false,
            viewport_height: 1000.0,
        }
    }

    fn paged(index: usize, count: usize) -> NavContext {
        NavContext { mode: UiMode::Paged(PageCursor { index, count }), ..continuous() }
    }

    fn edges(left: EdgeTapBehavior, right: EdgeTapBehavior) -> ReaderSettings {
        ReaderSettings { left_edge_tap_behavior: left, right_edge_tap_behavior: right, ..ReaderSettings::default() }
    }

    fn run(settings: &ReaderSettings, ctx: &NavContext, event: InputEvent) -> Action {
        dispatch(settings, &EngineConfig::default(), ctx, &event)
    }

    #[test]
    fn centre_tap_toggles_and_visible_controls_hide() {
        let settings = ReaderSettings::default();
        assert_eq!(run(&settings, &continuous(), InputEvent::tap(400.0, 800.0)), Action::ToggleControls);
        let ctx = NavContext { controls_visible: true, ..continuous() };
        assert_eq!(run(&settings, &ctx, InputEvent::tap(10.0, 800.0)), Action::HideControls);
    }

    #[test]
    fn edge_scroll_in_continuous_mode() {
        let settings = edges(EdgeTapBehavior::ScrollUp, EdgeTapBehavior::ScrollDown);
        assert_eq!(run(&settings, &continuous(), InputEvent::tap(120.0, 800.0)), Action::ScrollBy(-800.0));
        assert_eq!(run(&settings, &continuous(), InputEvent::tap(680.0, 800.0)), Action::ScrollBy(800.0));

        let pinned = NavContext { scroll: ScrollExtremes { at_top: true, at_bottom: false }, ..continuous() };
        assert_eq!(run(&settings, &pinned, InputEvent::tap(0.0, 800.0)), Action::None);
    }

    #[test]
    fn edge_scroll_turns_pages_in_paged_mode() {
        let settings = edges(EdgeTapBehavior::ScrollUp, EdgeTapBehavior::ScrollDown);
        assert_eq!(run(&settings, &paged(1, 3), InputEvent::tap(0.0, 800.0)), Action::PrevPage);
        assert_eq!(run(&settings, &paged(0, 3), InputEvent::tap(0.0, 800.0)), Action::None);
        assert_eq!(run(&settings, &paged(2, 3), InputEvent::tap(800.0, 800.0)), Action::None);
    }

    #[test]
    fn chapter_edges_turn_pages_before_chapters() {
        let settings = edges(EdgeTapBehavior::Chapter, EdgeTapBehavior::Chapter);
        assert_eq!(run(&settings, &paged(0, 3), InputEvent::tap(800.0, 800.0)), Action::NextPage);
        assert_eq!(run(&settings, &paged(2, 3), InputEvent::tap(800.0, 800.0)), Action::NextChapter);
        assert_eq!(run(&settings, &paged(0, 3), InputEvent::tap(0.0, 800.0)), Action::PrevChapter);
    }

    #[test]
    fn swipes_follow_their_gesture_setting() {
        let settings = ReaderSettings {
            swipe_left_gesture: SwipeGesture::NextChapter,
            swipe_right_gesture: SwipeGesture::PrevChapter,
            ..ReaderSettings::default()
        };
        assert_eq!(run(&settings, &continuous(), InputEvent::Swipe(SwipeDirection::Left)), Action::NextChapter);
        assert_eq!(run(&settings, &paged(1, 2), InputEvent::Swipe(SwipeDirection::Right)), Action::PrevPage);

        let first = NavContext { has_prev_chapter: false, ..continuous() };
        assert_eq!(run(&settings, &first, InputEvent::Swipe(SwipeDirection::Right)), Action::None);
        assert_eq!(run(&ReaderSettings::default(), &continuous(), InputEvent::Swipe(SwipeDirection::Left)), Action::None);
    }

    #[test]
    fn arrow_keys_respect_guards() {
        let settings = ReaderSettings::default();
        assert_eq!(run(&settings, &continuous(), InputEvent::key("ArrowRight")), Action::NextChapter);
        assert_eq!(run(&settings, &continuous(), InputEvent::key("ArrowLeft")), Action::PrevChapter);
        assert_eq!(run(&settings, &continuous(), InputEvent::key("Enter")), Action::None);

        let with_ctrl = InputEvent::Key {
            key: "ArrowRight".into(),
            modifiers: Modifiers { ctrl: true, ..Modifiers::default() },
            text_input_focused: false,
        };
        assert_eq!(run(&settings, &continuous(), with_ctrl), Action::None);

        let typing = InputEvent::Key { key: "ArrowRight".into(), modifiers: Modifiers::default(), text_input_focused: true };
        assert_eq!(run(&settings, &continuous(), typing), Action::None);

        let disabled = ReaderSettings { keyboard_navigation: false, ..ReaderSettings::default() };
        assert_eq!(run(&disabled, &continuous(), InputEvent::key("ArrowRight")), Action::None);
    }
}
