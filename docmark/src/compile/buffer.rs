use serde::Deserialize;

/// The unit the target document counts indices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexUnit {
    /// Unicode scalar values.
    #[default]
    CodePoint,
    /// UTF-16 code units, as the Google Docs API addresses its body.
    Utf16,
}

impl IndexUnit {
    pub fn measure(self, text: &str) -> u64 {
        match self {
            IndexUnit::CodePoint => text.chars().count() as u64,
            IndexUnit::Utf16 => text.encode_utf16().count() as u64,
        }
    }
}

/// The flattened text output. Text only grows through `append` and only
/// shrinks back to a [`Mark`], so the logical length always matches the text.
#[derive(Debug, Clone)]
pub struct LinearBuffer {
    text: String,
    len: u64,
    unit: IndexUnit,
}

impl LinearBuffer {
    pub fn new(unit: IndexUnit) -> Self {
        LinearBuffer {
            text: String::new(),
            len: 0,
            unit,
        }
    }

    pub fn append(&mut self, text: &str) {
        self.len += self.unit.measure(text);
        self.text.push_str(text);
    }

    pub fn mark(&self) -> Mark {
        Mark {
            bytes: self.text.len(),
            len: self.len,
        }
    }

    /// Drop everything appended since `mark` was taken.
    pub fn rewind(&mut self, mark: Mark) {
        if mark.bytes <= self.text.len() {
            self.text.truncate(mark.bytes);
            self.len = mark.len;
        }
    }

    /// Length in the buffer's index unit, not in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// A position in a [`LinearBuffer`] to rewind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    bytes: usize,
    len: u64,
}

/// Write cursor in target-document index space. Holds only the base; the
/// position is read off the buffer every time.
#[derive(Debug, Clone, Copy)]
pub struct IndexTracker {
    base: u64,
}

impl IndexTracker {
    pub fn new(base: u64) -> Self {
        IndexTracker { base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn current(&self, buffer: &LinearBuffer) -> u64 {
        self.base + buffer.len()
    }
}
