use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    /// Towards older entries (up arrow).
    Older,
    /// Towards newer entries and finally the line being edited (down arrow).
    Newer,
}

/// Bounded list of submitted lines with a replay cursor.
///
/// The cursor ranges over `0..=len()`; `len()` is the past-end position meaning
/// "editing a fresh line, not replaying".
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<String>,
    position: usize,
    limit: Option<usize>,
}

impl History {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            position: 0,
            limit,
        }
    }

    /// Append `line` unless it is empty or repeats the newest entry, then drop
    /// the oldest entries beyond the limit. The cursor moves past the end.
    pub fn record_if_new(&mut self, line: &str) -> bool {
        let recorded = !line.is_empty() && self.entries.back().map(String::as_str) != Some(line);
        if recorded {
            self.entries.push_back(line.to_string());
            if let Some(limit) = self.limit {
                while self.entries.len() > limit {
                    self.entries.pop_front();
                }
            }
        }
        self.position = self.entries.len();
        recorded
    }

    /// Step the cursor by one. Returns the entry at the new position, the empty
    /// line when the cursor reaches the past-end position, or `None` when it
    /// cannot move.
    pub fn navigate(&mut self, direction: HistoryDirection) -> Option<String> {
        match direction {
            HistoryDirection::Older => {
                if self.position == 0 {
                    return None;
                }
                self.position -= 1;
                self.entries.get(self.position).cloned()
            }
            HistoryDirection::Newer => {
                if self.position >= self.entries.len() {
                    return None;
                }
                self.position += 1;
                Some(self.entries.get(self.position).cloned().unwrap_or_default())
            }
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.position = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_past_end(&self) -> bool {
        self.position >= self.entries.len()
    }

    /// Entries from newest to oldest.
    pub fn newest_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_if_new() {
        let mut history = History::new(None);
        assert!(history.record_if_new("ls"));
        assert!(history.record_if_new("pwd"));
        assert!(!history.record_if_new("pwd"));
        assert!(!history.record_if_new(""));
        assert!(history.record_if_new("ls"));
        assert_eq!(history.newest_first().collect::<Vec<_>>(), vec!["ls", "pwd", "ls"]);
        assert!(history.is_past_end());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(Some(2));
        history.record_if_new("a");
        history.record_if_new("b");
        history.record_if_new("c");
        assert_eq!(history.len(), 2);
        assert_eq!(history.newest_first().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_eq!(history.position(), 2);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut history = History::new(Some(100));
        history.record_if_new("first");
        history.record_if_new("second");

        assert_eq!(history.navigate(HistoryDirection::Older), Some("second".to_string()));
        assert_eq!(history.navigate(HistoryDirection::Older), Some("first".to_string()));
        assert_eq!(history.navigate(HistoryDirection::Older), None);
        assert_eq!(history.position(), 0);

        assert_eq!(history.navigate(HistoryDirection::Newer), Some("second".to_string()));
        assert_eq!(history.navigate(HistoryDirection::Newer), Some(String::new()));
        assert!(history.is_past_end());
        assert_eq!(history.navigate(HistoryDirection::Newer), None);
    }

    #[test]
    fn test_navigate_empty_history() {
        let mut history = History::new(None);
        assert_eq!(history.navigate(HistoryDirection::Older), None);
        assert_eq!(history.navigate(HistoryDirection::Newer), None);
    }

    #[test]
    fn test_reset_clears_entries_and_position() {
        let mut history = History::new(None);
        history.record_if_new("python");
        history.navigate(HistoryDirection::Older);
        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.position(), 0);
        assert_eq!(history.navigate(HistoryDirection::Older), None);
    }
}
