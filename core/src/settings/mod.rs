//! Reader preferences: the settings record and its persistent store.

pub mod store;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::InvalidSetting;
use crate::types::{TextAlign, Typography};

pub use store::{SETTINGS_VERSION, SettingsSnapshot, SettingsStore};

/// What tapping a screen edge does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeTapBehavior {
    #[default]
    None,
    ScrollUp,
    ScrollDown,
    Chapter,
}

/// What a horizontal swipe does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwipeGesture {
    #[default]
    None,
    PrevChapter,
    NextChapter,
}

/// When a chapter is reported as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkReadBehavior {
    None,
    /// Only through the explicit button.
    #[default]
    Button,
    /// When navigating to the next or previous chapter.
    Automatic,
    ButtonAutomatic,
}

impl MarkReadBehavior {
    pub fn on_navigation(self) -> bool {
        matches!(self, Self::Automatic | Self::ButtonAutomatic)
    }

    pub fn shows_button(self) -> bool {
        matches!(self, Self::Button | Self::ButtonAutomatic)
    }
}

/// Every reader preference. Each field is persisted on its own under `reader.<fieldName>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderSettings {
    pub font_size: f32,
    pub font_family: Option<String>,
    pub text_align: TextAlign,
    pub font_color: Option<String>,
    pub background_color: Option<String>,
    pub margin: f32,
    pub line_spacing: f32,
    pub dim_level: u8,
    pub page_mode: bool,
    pub show_pages: bool,
    pub show_page_slider: bool,
    pub left_edge_tap_behavior: EdgeTapBehavior,
    pub right_edge_tap_behavior: EdgeTapBehavior,
    pub swipe_left_gesture: SwipeGesture,
    pub swipe_right_gesture: SwipeGesture,
    pub keyboard_navigation: bool,
    pub mark_read_behavior: MarkReadBehavior,
    pub text_selectable: bool,
    pub save_position: bool,
    pub night_mode: bool,
    pub night_mode_strength: u8,
    pub night_mode_schedule_enabled: bool,
    pub night_mode_start_time: String,
    pub night_mode_end_time: String,
}

/// Persisted field names, in declaration order.
pub const FIELD_NAMES: &[&str] = &[
    "fontSize",
    "fontFamily",
    "textAlign",
    "fontColor",
    "backgroundColor",
    "margin",
    "lineSpacing",
    "dimLevel",
    "pageMode",
    "showPages",
    "showPageSlider",
    "leftEdgeTapBehavior",
    "rightEdgeTapBehavior",
    "swipeLeftGesture",
    "swipeRightGesture",
    "keyboardNavigation",
    "markReadBehavior",
    "textSelectable",
    "savePosition",
    "nightMode",
    "nightModeStrength",
    "nightModeScheduleEnabled",
    "nightModeStartTime",
    "nightModeEndTime",
];

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            font_family: None,
            text_align: TextAlign::Justify,
            font_color: None,
            background_color: None,
            margin: 0.0,
            line_spacing: 1.6,
            dim_level: 0,
            page_mode: false,
            show_pages: true,
            show_page_slider: false,
            left_edge_tap_behavior: EdgeTapBehavior::None,
            right_edge_tap_behavior: EdgeTapBehavior::None,
            swipe_left_gesture: SwipeGesture::None,
            swipe_right_gesture: SwipeGesture::None,
            keyboard_navigation: true,
            mark_read_behavior: MarkReadBehavior::Button,
            text_selectable: true,
            save_position: true,
            night_mode: false,
            night_mode_strength: 30,
            night_mode_schedule_enabled: false,
            night_mode_start_time: "20:00".to_string(),
            night_mode_end_time: "06:00".to_string(),
        }
    }
}

impl ReaderSettings {
    /// The settings that determine page layout.
    pub fn typography(&self) -> Typography {
        Typography {
            font_size: self.font_size,
            font_family: self.font_family.clone(),
            line_spacing: self.line_spacing,
            margin: self.margin,
            text_align: self.text_align,
        }
    }

    pub fn is_known_field(name: &str) -> bool {
        FIELD_NAMES.contains(&name)
    }

    /// Range checks the type system cannot express.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        check_range("fontSize", self.font_size, 12.0, 32.0)?;
        check_range("lineSpacing", self.line_spacing, 1.0, 3.0)?;
        check_range("margin", self.margin, -2.0, 22.0)?;
        if self.dim_level > 90 {
            return Err(InvalidSetting::new("dimLevel", format!("{} is above 90", self.dim_level)));
        }
        if !(10..=90).contains(&self.night_mode_strength) {
            return Err(InvalidSetting::new(
                "nightModeStrength",
                format!("{} is outside 10..=90", self.night_mode_strength),
            ));
        }
        parse_clock("nightModeStartTime", &self.night_mode_start_time)?;
        parse_clock("nightModeEndTime", &self.night_mode_end_time)?;
        Ok(())
    }
}

/// Parse an `HH:MM` setting value.
pub fn parse_clock(field: &str, value: &str) -> Result<NaiveTime, InvalidSetting> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|err| InvalidSetting::new(field, format!("`{value}` is not an HH:MM time ({err})")))
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<(), InvalidSetting> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InvalidSetting::new(field, format!("{value} is outside {min}..={max}")))
    }
}
