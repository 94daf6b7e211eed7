//! Consecutive-sample debounce for the front distance flags.

/// Blocks after `required` consecutive samples below `threshold`; any single
/// sample at or above it clears immediately.
#[derive(Debug, Clone)]
pub struct Debouncer {
    threshold: f32,
    required: u32,
    below: u32,
    blocked: bool,
}

impl Debouncer {
    pub fn new(threshold: f32, required: u32) -> Self {
        Self {
            threshold,
            required: required.max(1),
            below: 0,
            blocked: false,
        }
    }

    /// Feed one sample. Returns `true` while the path is clear.
    pub fn update(&mut self, sample: f32) -> bool {
        if sample < self.threshold {
            self.below = self.below.saturating_add(1);
            if self.below >= self.required {
                self.blocked = true;
            }
        } else {
            self.below = 0;
            self.blocked = false;
        }
        !self.blocked
    }

    pub fn is_clear(&self) -> bool {
        !self.blocked
    }
}
