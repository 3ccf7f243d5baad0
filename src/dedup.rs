// MIT License - Copyright (c) 2026 Peter Wright
// Consecutive duplicate suppression

/// Thins runs of identical consecutive lines.
///
/// With a limit of `N`, every `N` suppressed duplicates are followed by one
/// that is let through; a limit of 0 suppresses every repeat. A different
/// line always passes and restarts the count.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter {
    limit: Option<u32>,
    last: Option<String>,
    skipped: u32,
}

impl DuplicateFilter {
    /// `None` disables filtering.
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            last: None,
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Returns true if `line` should be emitted.
    pub fn accept(&mut self, line: &str) -> bool {
        let Some(limit) = self.limit else {
            self.remember(line);
            return true;
        };

        if self.last.as_deref() != Some(line) {
            self.skipped = 0;
            self.remember(line);
            return true;
        }

        if self.skipped < limit {
            self.skipped += 1;
            false
        } else {
            self.skipped = 0;
            true
        }
    }

    fn remember(&mut self, line: &str) {
        match &mut self.last {
            Some(last) => {
                last.clear();
                last.push_str(line);
            }
            None => self.last = Some(line.to_string()),
        }
    }
}
