// WHY: Claimed offsets arrive as character offsets while Rust slices by byte
// Type-safe position wrappers keep the two from being mixed up inside the pipeline

/// 0-based byte position in the prose
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BytePos(pub usize);

/// 0-based character position in the prose
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CharPos(pub usize);

impl From<BytePos> for usize {
    fn from(pos: BytePos) -> Self {
        pos.0
    }
}

impl From<CharPos> for usize {
    fn from(pos: CharPos) -> Self {
        pos.0
    }
}

impl BytePos {
    pub fn new(pos: usize) -> Self {
        BytePos(pos)
    }

    pub fn advance(&self, offset: usize) -> Self {
        BytePos(self.0 + offset)
    }
}

impl CharPos {
    pub fn new(pos: usize) -> Self {
        CharPos(pos)
    }
}

/// Half-open byte range `[start, end)` resolved inside the prose
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TextRange {
    pub start: BytePos,
    pub end: BytePos,
}

impl TextRange {
    pub fn new(start: BytePos, end: BytePos) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Immutable prose snapshot with a precomputed char -> byte table
///
/// Built once per segmentation call so every char/byte conversion is O(1)
/// or O(log n) instead of rescanning the text.
#[derive(Debug)]
pub struct ProseText<'a> {
    text: &'a str,
    // Byte offset of every char plus a trailing sentinel at text.len()
    char_starts: Vec<usize>,
}

impl<'a> ProseText<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_starts.push(text.len());
        Self { text, char_starts }
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    pub fn char_len(&self) -> usize {
        self.char_starts.len() - 1
    }

    pub fn end(&self) -> BytePos {
        BytePos(self.text.len())
    }

    /// Byte position of a character offset, `None` when past the end
    pub fn byte_of(&self, pos: CharPos) -> Option<BytePos> {
        self.char_starts.get(pos.0).copied().map(BytePos)
    }

    /// Byte position of a signed wire offset, clamped into the prose
    pub fn clamp_signed(&self, offset: i64) -> BytePos {
        if offset <= 0 {
            return BytePos(0);
        }
        let idx = (offset as usize).min(self.char_len());
        BytePos(self.char_starts[idx])
    }

    /// Character offset of a byte position that lies on a char boundary
    pub fn char_of(&self, pos: BytePos) -> CharPos {
        match self.char_starts.binary_search(&pos.0) {
            Ok(idx) => CharPos(idx),
            Err(idx) => CharPos(idx.saturating_sub(1)),
        }
    }

    pub fn slice(&self, range: TextRange) -> &'a str {
        let end = range.end.0.min(self.text.len());
        let start = range.start.0.min(end);
        &self.text[start..end]
    }

    pub fn slice_from(&self, start: BytePos) -> &'a str {
        &self.text[start.0.min(self.text.len())..]
    }

    pub fn char_at(&self, pos: BytePos) -> Option<char> {
        self.slice_from(pos).chars().next()
    }

    pub fn char_before(&self, pos: BytePos) -> Option<char> {
        self.text[..pos.0.min(self.text.len())].chars().next_back()
    }
}
