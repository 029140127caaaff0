//! Location autocomplete: catalog filtering, keyboard highlight and commit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{Catalog, LocationMode};

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(200);

/// A cancellable one-shot deadline. Re-arming replaces the previous deadline.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before firing, or `None` when idle.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns true exactly once per arm, when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Case-insensitive substring filter preserving catalog order.
pub fn filter_catalog<'a>(catalog: &'a Catalog, query: &str) -> Vec<&'a str> {
    let needle = query.to_lowercase();
    catalog
        .names()
        .iter()
        .filter(|name| name.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

#[derive(Debug, Clone)]
pub struct LocationMatcher {
    catalog: Arc<Catalog>,
    mode: LocationMode,
    value: String,
    pending_query: String,
    filtered: Vec<usize>,
    highlight: Option<usize>,
    visible: bool,
    debounce: Debounce,
}

impl LocationMatcher {
    pub fn new(catalog: Arc<Catalog>, mode: LocationMode) -> Self {
        let filtered = (0..catalog.len()).collect();
        Self {
            catalog,
            mode,
            value: String::new(),
            pending_query: String::new(),
            filtered,
            highlight: None,
            visible: false,
            debounce: Debounce::new(DEBOUNCE_DELAY),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mode(&self) -> LocationMode {
        self.mode
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the suggestion panel should be drawn at all.
    pub fn shows_list(&self) -> bool {
        self.visible && !self.filtered.is_empty()
    }

    pub fn suggestions(&self) -> impl Iterator<Item = &str> + '_ {
        self.filtered.iter().map(|&i| self.catalog.names()[i].as_str())
    }

    pub fn suggestion_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn debounce(&self) -> &Debounce {
        &self.debounce
    }

    /// Record raw input and schedule a filter pass.
    pub fn set_query(&mut self, text: &str, now: Instant) {
        if self.mode == LocationMode::ClosedSelect {
            return;
        }
        self.value = text.to_string();
        self.pending_query = text.to_string();
        self.visible = true;
        self.debounce.arm(now);
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        let mut text = self.value.clone();
        text.push(c);
        self.set_query(&text, now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        let mut text = self.value.clone();
        if text.pop().is_some() {
            self.set_query(&text, now);
        }
    }

    /// Run the scheduled filter pass if its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debounce.fire(now) {
            let query = std::mem::take(&mut self.pending_query);
            self.recompute_filter(&query);
            true
        } else {
            false
        }
    }

    pub fn recompute_filter(&mut self, query: &str) {
        let needle = query.to_lowercase();
        self.filtered = self
            .catalog
            .names()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.highlight = None;
        debug!(query, matches = self.filtered.len(), "location filter recomputed");
    }

    /// Opens the panel without touching the query. Used by closed-select mode.
    pub fn open(&mut self) {
        self.visible = true;
    }

    pub fn move_highlight(&mut self, direction: Direction) {
        if !self.visible || self.filtered.is_empty() {
            return;
        }
        let last = self.filtered.len() - 1;
        self.highlight = Some(match (direction, self.highlight) {
            (Direction::Down, None) => 0,
            (Direction::Down, Some(i)) => (i + 1).min(last),
            (Direction::Up, None) => 0,
            (Direction::Up, Some(i)) => i.saturating_sub(1).min(last),
        });
    }

    /// Commits the highlighted suggestion. Returns false when nothing is highlighted.
    pub fn commit_highlighted(&mut self) -> bool {
        let Some(i) = self.highlight else {
            return false;
        };
        let Some(&idx) = self.filtered.get(i) else {
            return false;
        };
        let chosen = self.catalog.names()[idx].clone();
        self.commit_value(&chosen);
        true
    }

    pub fn commit_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.visible = false;
        self.debounce.cancel();
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    pub fn is_valid(&self) -> bool {
        self.catalog.contains(&self.value)
    }
}
