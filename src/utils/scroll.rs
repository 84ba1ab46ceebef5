//! Wrapping and scroll bookkeeping for the transcript view.
//!
//! Lines are wrapped here rather than by ratatui so the line count used for
//! scrolling always matches what is drawn.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Word-wrap `text` to `width` display columns. Explicit newlines are kept,
/// words wider than the line are broken, and double-width characters count
/// as two columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        let mut line_width = 0usize;

        for word in paragraph.split(' ') {
            let word_width = UnicodeWidthStr::width(word);
            let needed = if line.is_empty() {
                word_width
            } else {
                line_width + 1 + word_width
            };

            if needed <= width {
                if !line.is_empty() {
                    line.push(' ');
                    line_width += 1;
                }
                line.push_str(word);
                line_width += word_width;
                continue;
            }

            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if line_width + ch_width > width && !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(ch);
                line_width += ch_width;
            }
        }

        out.push(line);
    }

    out
}

pub fn max_scroll_offset(total_lines: usize, viewport_height: u16) -> u16 {
    let total = u16::try_from(total_lines).unwrap_or(u16::MAX);
    total.saturating_sub(viewport_height)
}

/// Scroll position of the transcript. While `auto_scroll` is set the view
/// follows the newest line. The last drawn size is remembered so key
/// handlers can scroll without knowing the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub offset: u16,
    pub auto_scroll: bool,
    total_lines: usize,
    viewport_height: u16,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            auto_scroll: true,
            total_lines: 0,
            viewport_height: 0,
        }
    }
}

impl ScrollState {
    /// Offset to draw with, updating the stored one to stay in bounds.
    pub fn resolve(&mut self, total_lines: usize, viewport_height: u16) -> u16 {
        self.total_lines = total_lines;
        self.viewport_height = viewport_height;
        let max = self.max_offset();
        if self.auto_scroll || self.offset >= max {
            self.offset = max;
            self.auto_scroll = true;
        }
        self.offset
    }

    pub fn viewport_height(&self) -> u16 {
        self.viewport_height
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.offset = self.offset.saturating_sub(lines);
        self.auto_scroll = false;
    }

    /// Moving past the last line re-enables following.
    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_offset();
        self.offset = self.offset.saturating_add(lines).min(max);
        self.auto_scroll = self.offset >= max;
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.auto_scroll = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.auto_scroll = true;
    }

    fn max_offset(&self) -> u16 {
        max_scroll_offset(self.total_lines, self.viewport_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_word_boundaries() {
        assert_eq!(wrap_text("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap_text("hi there you", 8), vec!["hi there", "you"]);
    }

    #[test]
    fn breaks_words_longer_than_the_line() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn keeps_explicit_newlines_and_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("line\r\nnext", 10), vec!["line", "next"]);
    }

    #[test]
    fn double_width_characters_take_two_columns() {
        assert_eq!(wrap_text("你好世界", 4), vec!["你好", "世界"]);
    }

    #[test]
    fn follows_the_bottom_until_scrolled_up() {
        let mut scroll = ScrollState::default();
        assert_eq!(scroll.resolve(30, 10), 20);
        assert_eq!(scroll.resolve(35, 10), 25);

        scroll.scroll_up(5);
        assert_eq!(scroll.resolve(40, 10), 20);
        assert!(!scroll.auto_scroll);

        scroll.scroll_down(100);
        assert!(scroll.auto_scroll);
        assert_eq!(scroll.resolve(45, 10), 35);
    }

    #[test]
    fn short_transcripts_never_scroll() {
        let mut scroll = ScrollState::default();
        assert_eq!(scroll.resolve(3, 10), 0);
        scroll.scroll_down(5);
        assert_eq!(scroll.offset, 0);
        assert_eq!(scroll.viewport_height(), 10);
    }
}
