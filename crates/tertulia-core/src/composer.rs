//! Multi-line text entry with a character-indexed cursor.

/// Upper bound on the number of rows the entry grows to before it scrolls.
pub const MAX_VISIBLE_ROWS: u16 = 5;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    cursor: usize, // in chars
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let char_count = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    /// Start of the current line
    pub fn move_home(&mut self) {
        let (_, col) = self.cursor_row_col();
        self.cursor -= col;
    }

    /// End of the current line
    pub fn move_end(&mut self) {
        let rest = self.text.chars().skip(self.cursor);
        let to_eol = rest.take_while(|&c| c != '\n').count();
        self.cursor += to_eol;
    }

    /// Take the draft out, leaving the entry empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.take();
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Rows the entry needs to show the whole draft, clamped to
    /// `1..=MAX_VISIBLE_ROWS`.
    pub fn visible_rows(&self) -> u16 {
        (self.line_count() as u16).clamp(1, MAX_VISIBLE_ROWS)
    }

    /// Zero-based (row, column) of the cursor, both in chars.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|line| line.chars().count())
            .unwrap_or(0);
        (row, col)
    }
}
