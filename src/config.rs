use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Settings for one load call.
///
/// Everything has a default, so `LoadOptions::default()` loads the data only,
/// detects the format from the path and reads text files the way OpenSignals
/// writes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Also return the parsed header.
    pub with_header: bool,
    /// Format tag that bypasses detection (`"txt"`, `"h5"`, ...).
    pub format_hint: Option<String>,
    /// Text-format reader settings.
    pub text: TextOptions,
}

impl LoadOptions {
    pub fn with_header(mut self, with_header: bool) -> Self {
        self.with_header = with_header;
        self
    }

    pub fn with_format_hint(mut self, tag: impl Into<String>) -> Self {
        self.format_hint = Some(tag.into());
        self
    }

    pub fn with_text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    /// Parse options from a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// How the sample block of a text recording is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Prefix of header lines; rows starting with it are not data.
    pub comment_marker: char,
    /// Column separator of the sample rows.
    pub delimiter: char,
    /// Data rows to drop after the header block.
    pub skip_rows: usize,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            comment_marker: '#',
            delimiter: '\t',
            skip_rows: 0,
            max_rows: None,
        }
    }
}

impl TextOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Header marker as written on the header line, e.g. `"# "`.
    pub(crate) fn header_prefix(&self) -> String {
        format!("{} ", self.comment_marker)
    }
}
