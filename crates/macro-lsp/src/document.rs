//! Byte offset and LSP position conversion.

use macro_syntax::Span;
use tower_lsp::lsp_types::{Position, Range};

/// Line start offsets of one source text
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_offsets: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        Self {
            line_offsets: compute_line_offsets(content),
            len: content.len(),
        }
    }

    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self
            .line_offsets
            .iter()
            .rposition(|&o| o <= offset)
            .unwrap_or(0);
        let character = offset - self.line_offsets[line];
        Position::new(line as u32, character as u32)
    }

    /// Positions past the end of a line clamp to the end of that line
    pub fn position_to_offset(&self, position: Position) -> usize {
        let line = position.line as usize;
        let Some(&start) = self.line_offsets.get(line) else {
            return self.len;
        };
        let end = self
            .line_offsets
            .get(line + 1)
            .map_or(self.len, |next| next.saturating_sub(1));
        (start + position.character as usize).min(end.max(start))
    }

    pub fn range(&self, span: Span) -> Range {
        Range::new(
            self.offset_to_position(span.start),
            self.offset_to_position(span.end),
        )
    }
}

fn compute_line_offsets(content: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, c) in content.char_indices() {
        if c == '\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}
