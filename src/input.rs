use std::collections::HashSet;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    /// Letter key, normalized to upper case.
    pub fn letter(ch: char) -> Self {
        Self::Character(ch.to_ascii_uppercase())
    }
}

/// Non-character keys the demo reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    NumpadAdd,
    NumpadSubtract,
    Escape,
}

/// Keyboard and wheel state for the current frame.
///
/// Platform events are fed in between frames; `end_frame` drops the
/// per-frame transitions once update has consumed them.
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    wheel: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key going down. Returns `true` on the up→down edge only.
    pub fn set_key_down(&mut self, key: KeyCode) -> bool {
        let edge = self.keys_down.insert(key);
        if edge {
            self.pressed.insert(key);
        }
        edge
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    /// Accumulates wheel motion in lines; positive scrolls away from the user.
    pub fn add_wheel(&mut self, lines: f32) {
        self.wheel += lines;
    }

    /// Clears held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_down.clear();
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `key` went down since the last `end_frame`.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn wheel_delta(&self) -> f32 {
        self.wheel
    }

    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.wheel = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_edge_triggered() {
        let mut state = InputState::new();
        let y = KeyCode::letter('y');
        assert!(state.set_key_down(y));
        assert!(state.is_key_pressed(y));
        state.end_frame();

        // OS key repeat while held
        assert!(!state.set_key_down(y));
        assert!(!state.is_key_pressed(y));
        assert!(state.is_key_down(y));

        state.set_key_up(y);
        state.end_frame();
        assert!(state.set_key_down(y));
        assert!(state.is_key_pressed(y));
    }

    #[test]
    fn wheel_accumulates_until_frame_end() {
        let mut state = InputState::new();
        state.add_wheel(1.0);
        state.add_wheel(0.5);
        assert_eq!(state.wheel_delta(), 1.5);
        state.end_frame();
        assert_eq!(state.wheel_delta(), 0.0);
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::Named(NamedKey::NumpadAdd));
        state.release_all();
        assert!(!state.is_key_down(KeyCode::Named(NamedKey::NumpadAdd)));
    }
}
