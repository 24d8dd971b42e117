use crate::Number;

const NOTES: usize = 128;
const NONE: u8 = u8::MAX;

/// Held notes of one channel in the order they were pressed, with the most
/// recent on top.
///
/// A doubly linked list threaded through fixed arrays indexed by note number,
/// so push, remove and top are all O(1) and nothing allocates after
/// construction.
#[derive(Debug, Clone)]
pub struct NoteStack {
    top: u8,
    below: [u8; NOTES],
    above: [u8; NOTES],
    velocities: [Number; NOTES],
    held: [bool; NOTES],
}

impl NoteStack {
    pub fn new() -> Self {
        Self {
            top: NONE,
            below: [NONE; NOTES],
            above: [NONE; NOTES],
            velocities: [0.0; NOTES],
            held: [false; NOTES],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top == NONE
    }

    /// The most recently pressed note that is still held, with its velocity.
    pub fn top(&self) -> Option<(u8, Number)> {
        (self.top != NONE).then(|| (self.top, self.velocities[self.top as usize]))
    }

    pub fn contains(&self, note: u8) -> bool {
        self.held.get(note as usize).copied().unwrap_or(false)
    }

    /// Put `note` on top. A note that is already held moves to the top.
    pub fn push(&mut self, note: u8, velocity: Number) {
        if note as usize >= NOTES {
            return;
        }

        self.remove(note);

        let index = note as usize;
        self.below[index] = self.top;
        self.above[index] = NONE;
        self.velocities[index] = velocity;
        self.held[index] = true;

        if self.top != NONE {
            self.above[self.top as usize] = note;
        }

        self.top = note;
    }

    pub fn remove(&mut self, note: u8) {
        if !self.contains(note) {
            return;
        }

        let index = note as usize;
        let below = self.below[index];
        let above = self.above[index];

        if below != NONE {
            self.above[below as usize] = above;
        }

        if above != NONE {
            self.below[above as usize] = below;
        } else {
            self.top = below;
        }

        self.below[index] = NONE;
        self.above[index] = NONE;
        self.held[index] = false;
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for NoteStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_note_wins() {
        let mut stack = NoteStack::new();
        assert!(stack.is_empty());

        stack.push(60, 0.5);
        stack.push(64, 0.6);
        stack.push(67, 0.7);

        assert_eq!(stack.top(), Some((67, 0.7)));

        stack.remove(67);
        assert_eq!(stack.top(), Some((64, 0.6)));
    }

    #[test]
    fn removing_from_the_middle_keeps_the_order() {
        let mut stack = NoteStack::new();
        stack.push(60, 0.1);
        stack.push(62, 0.2);
        stack.push(64, 0.3);

        stack.remove(62);
        assert!(!stack.contains(62));
        assert_eq!(stack.top(), Some((64, 0.3)));

        stack.remove(64);
        assert_eq!(stack.top(), Some((60, 0.1)));

        stack.remove(60);
        assert!(stack.is_empty());
    }

    #[test]
    fn pushing_a_held_note_moves_it_to_the_top() {
        let mut stack = NoteStack::new();
        stack.push(60, 0.1);
        stack.push(62, 0.2);
        stack.push(60, 0.9);

        assert_eq!(stack.top(), Some((60, 0.9)));

        stack.remove(60);
        assert_eq!(stack.top(), Some((62, 0.2)));

        stack.remove(62);
        assert_eq!(stack.top(), None);
    }

    #[test]
    fn ignores_unknown_notes() {
        let mut stack = NoteStack::new();
        stack.push(200, 1.0);
        stack.remove(61);

        assert!(stack.is_empty());
    }
}
