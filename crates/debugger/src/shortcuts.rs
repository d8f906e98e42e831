//! Keyboard shortcuts for session actions.
//!
//! Capturing key events is up to the front end, which hands each press to
//! [`ShortcutMap::resolve`] to find out whether it triggers an action.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::error::ShortcutError;

/// A key press as reported by the front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key_code: u32,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn key(key_code: u32) -> Self {
        Self {
            key_code,
            ..Default::default()
        }
    }
}

/// A key code with the modifiers that must be held.
///
/// Written as `+`-separated tokens, e.g. `ctrl + shift + 66`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyChord {
    key_code: u32,
    ctrl: bool,
    alt: bool,
    shift: bool,
}

impl KeyChord {
    /// A chord without modifiers.
    pub const fn key(key_code: u32) -> Self {
        Self {
            key_code,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub const fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub const fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub const fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Modifiers must match exactly.
    pub fn matches(&self, press: &KeyPress) -> bool {
        self.key_code == press.key_code
            && self.ctrl == press.ctrl
            && self.alt == press.alt
            && self.shift == press.shift
    }
}

impl FromStr for KeyChord {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chord = KeyChord::key(0);
        let mut key_code = None;
        for token in s.split('+').map(str::trim) {
            match token.to_ascii_lowercase().as_str() {
                "ctrl" => chord.ctrl = true,
                "alt" => chord.alt = true,
                "shift" => chord.shift = true,
                other => {
                    let code: u32 = other.parse().map_err(|_| ShortcutError::UnknownKey {
                        chord: s.to_string(),
                        token: token.to_string(),
                    })?;
                    if key_code.replace(code).is_some() {
                        return Err(ShortcutError::MultipleKeyCodes(s.to_string()));
                    }
                }
            }
        }
        chord.key_code = key_code.ok_or_else(|| ShortcutError::MissingKeyCode(s.to_string()))?;
        Ok(chord)
    }
}

impl TryFrom<String> for KeyChord {
    type Error = ShortcutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(value: KeyChord) -> Self {
        value.to_string()
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl + ")?;
        }
        if self.alt {
            f.write_str("alt + ")?;
        }
        if self.shift {
            f.write_str("shift + ")?;
        }
        write!(f, "{}", self.key_code)
    }
}

/// Key bindings for the actions that have shortcuts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortcutMap {
    pub start: KeyChord,
    pub stop: KeyChord,
    pub step_over: KeyChord,
    pub r#continue: KeyChord,
    pub breakpoint: KeyChord,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        Self {
            // F6, F9, F7, F8
            start: KeyChord::key(117),
            stop: KeyChord::key(120),
            step_over: KeyChord::key(118),
            r#continue: KeyChord::key(119),
            // ctrl + shift + B
            breakpoint: KeyChord::key(66).with_ctrl().with_shift(),
        }
    }
}

impl ShortcutMap {
    /// The action bound to `press`; a breakpoint toggles `cursor_line`.
    pub fn resolve(&self, press: &KeyPress, cursor_line: i64) -> Option<Action> {
        let bindings = [
            (&self.start, Action::Start),
            (&self.stop, Action::Stop),
            (&self.step_over, Action::StepOver),
            (&self.r#continue, Action::Continue),
            (&self.breakpoint, Action::Breakpoint { line: cursor_line }),
        ];
        bindings
            .into_iter()
            .find(|(chord, _)| chord.matches(press))
            .map(|(_, action)| action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chords() {
        let chord: KeyChord = "ctrl + shift + 66".parse().unwrap();
        assert_eq!(chord, KeyChord::key(66).with_ctrl().with_shift());
        assert_eq!(chord.to_string(), "ctrl + shift + 66");

        let chord: KeyChord = "Alt+117".parse().unwrap();
        assert_eq!(chord, KeyChord::key(117).with_alt());
    }

    #[test]
    fn reject_bad_chords() {
        assert!(matches!(
            "ctrl + x".parse::<KeyChord>(),
            Err(ShortcutError::UnknownKey { token, .. }) if token == "x"
        ));
        assert!(matches!(
            "ctrl + shift".parse::<KeyChord>(),
            Err(ShortcutError::MissingKeyCode(_))
        ));
        assert!(matches!(
            "65 + 66".parse::<KeyChord>(),
            Err(ShortcutError::MultipleKeyCodes(_))
        ));
    }

    #[test]
    fn default_bindings() {
        let shortcuts = ShortcutMap::default();
        assert_eq!(shortcuts.resolve(&KeyPress::key(117), 1), Some(Action::Start));
        assert_eq!(shortcuts.resolve(&KeyPress::key(120), 1), Some(Action::Stop));
        assert_eq!(shortcuts.resolve(&KeyPress::key(118), 1), Some(Action::StepOver));
        assert_eq!(shortcuts.resolve(&KeyPress::key(119), 1), Some(Action::Continue));

        let press = KeyPress {
            key_code: 66,
            ctrl: true,
            shift: true,
            ..Default::default()
        };
        assert_eq!(
            shortcuts.resolve(&press, 12),
            Some(Action::Breakpoint { line: 12 })
        );
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let shortcuts = ShortcutMap::default();
        let with_ctrl = KeyPress {
            ctrl: true,
            ..KeyPress::key(117)
        };
        assert_eq!(shortcuts.resolve(&with_ctrl, 1), None);
        assert_eq!(shortcuts.resolve(&KeyPress::key(66), 1), None);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let shortcuts: ShortcutMap =
            serde_json::from_value(serde_json::json!({"stop": "shift + 120"})).unwrap();
        assert_eq!(shortcuts.stop, KeyChord::key(120).with_shift());
        assert_eq!(shortcuts.start, KeyChord::key(117));

        let err = serde_json::from_value::<ShortcutMap>(serde_json::json!({"stop": "meta"}));
        assert!(err.is_err());
    }
}
