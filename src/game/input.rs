use std::collections::HashSet;

/// Keyboard state with one frame of history for edge detection.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pressed: HashSet<String>,
    last_pressed: HashSet<String>,
}

impl Input {
    pub fn press(&mut self, key: &str) {
        self.pressed.insert(key.to_lowercase());
    }

    pub fn release(&mut self, key: &str) {
        self.pressed.remove(&key.to_lowercase());
    }

    /// Held right now.
    pub fn is_down(&self, key: &str) -> bool {
        self.pressed.contains(&key.to_lowercase())
    }

    /// Became held since the last frame snapshot.
    pub fn is_pressed(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.pressed.contains(&key) && !self.last_pressed.contains(&key)
    }

    /// Called once per tick after updates have run.
    pub fn end_frame(&mut self) {
        self.last_pressed.clone_from(&self.pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_fires_once_per_press() {
        let mut input = Input::default();
        input.press("ArrowUp");
        assert!(input.is_pressed("arrowup"));
        assert!(input.is_down("ARROWUP"));
        input.end_frame();
        assert!(!input.is_pressed("arrowup"));
        assert!(input.is_down("arrowup"));

        input.release("arrowup");
        input.end_frame();
        input.press("arrowup");
        assert!(input.is_pressed("arrowup"));
    }

    #[test]
    fn press_and_release_within_a_frame_is_invisible() {
        let mut input = Input::default();
        input.press("a");
        input.release("a");
        assert!(!input.is_pressed("a"));
        assert!(!input.is_down("a"));
    }
}
