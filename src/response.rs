//! Outbound response values and their size-bounded rendering.

/// Hard upper bound on a single outbound message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// A domain-level reply, rendered and split into bounded chunks before
/// delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Mention string of the user being addressed; may be empty.
    pub to: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
    /// Destination channel override; empty means "reply where asked".
    pub channel: String,
}

impl Response {
    pub fn to_user(to: impl Into<String>) -> Self {
        Response {
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.to.is_empty() {
            out.push_str(&self.to);
            out.push('\n');
        }
        if !self.title.is_empty() {
            out.push_str(&self.title);
            out.push('\n');
        }
        if !self.description.is_empty() {
            out.push_str(&self.description);
            out.push('\n');
        }
        for field in &self.fields {
            out.push('\n');
            out.push_str(&field.name);
            out.push('\n');
            out.push_str(&field.value);
            out.push('\n');
        }

        out.trim_end().to_string()
    }

    /// Split the rendered text into messages of at most [`MAX_MESSAGE_LEN`]
    /// bytes, breaking on line boundaries. A single line longer than the
    /// bound is hard-split on a character boundary.
    pub fn split(&self) -> Vec<String> {
        let text = self.render();
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            for piece in split_line(line) {
                let extra = piece.len() + if current.is_empty() { 0 } else { 1 };
                if !current.is_empty() && current.len() + extra > MAX_MESSAGE_LEN {
                    chunks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(piece);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

fn split_line(line: &str) -> Vec<&str> {
    if line.len() <= MAX_MESSAGE_LEN {
        return vec![line];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut len = 0;

    for (idx, ch) in line.char_indices() {
        if len + ch.len_utf8() > MAX_MESSAGE_LEN {
            pieces.push(&line[start..idx]);
            start = idx;
            len = 0;
        }
        len += ch.len_utf8();
    }
    pieces.push(&line[start..]);

    pieces
}
