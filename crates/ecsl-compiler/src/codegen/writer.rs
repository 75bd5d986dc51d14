/// Line-oriented text buffer with tab indentation.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push('\t');
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write `header {` and indent.
    pub fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.indent += 1;
    }

    /// Dedent and write `}` followed by `suffix`.
    pub fn close_with(&mut self, suffix: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(format!("}}{}", suffix));
    }

    /// Close the current block and open a continuation, as in `} else {`.
    pub fn reopen(&mut self, header: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(format!("}} {} {{", header));
        self.indent += 1;
    }

    pub fn close(&mut self) {
        self.close_with("");
    }

    pub fn finish(self) -> String {
        self.out
    }
}
