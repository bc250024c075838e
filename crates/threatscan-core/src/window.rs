//! Word-count-bounded text windows.
//!
//! Source documents are fed line by line. Lines accumulate into a window
//! until it holds at least `min_words` whitespace-delimited words, at which
//! point the window is flushed and a new one starts. Whatever remains at end
//! of input is flushed by [`Windower::finish`].

use crate::config::WindowConfig;

/// Accumulates lines into windows.
#[derive(Debug, Clone)]
pub struct Windower {
    min_words: usize,
    skip_prefixes: Vec<String>,
    buf: String,
    words: usize,
}

impl Windower {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            min_words: config.min_words,
            skip_prefixes: config.skip_prefixes.clone(),
            buf: String::new(),
            words: 0,
        }
    }

    /// Whether `line` is a separator or quoted block that never enters a window.
    pub fn is_skipped(&self, line: &str) -> bool {
        self.skip_prefixes
            .iter()
            .any(|p| !p.is_empty() && line.starts_with(p.as_str()))
    }

    /// Add one line. Returns the completed window once it reaches `min_words`.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);
        if self.is_skipped(line) {
            return None;
        }

        let n = line.split_whitespace().count();
        if n == 0 {
            return None;
        }

        if !self.buf.is_empty() {
            self.buf.push(' ');
        }
        self.buf.push_str(line);
        self.words += n;

        if self.words < self.min_words {
            return None;
        }
        Some(self.take())
    }

    /// Flush the partial window at end of input. `None` if it holds no words.
    pub fn finish(&mut self) -> Option<String> {
        if self.words == 0 {
            self.buf.clear();
            return None;
        }
        Some(self.take())
    }

    /// Words in the window under construction.
    pub fn pending_words(&self) -> usize {
        self.words
    }

    fn take(&mut self) -> String {
        self.words = 0;
        std::mem::take(&mut self.buf)
    }
}

/// Split a whole document into windows. Convenience over [`Windower`].
pub fn split_windows(text: &str, config: &WindowConfig) -> Vec<String> {
    let mut windower = Windower::new(config);
    let mut out: Vec<String> = text.lines().filter_map(|l| windower.push_line(l)).collect();
    out.extend(windower.finish());
    out
}
