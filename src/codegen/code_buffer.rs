use std::collections::HashMap;
use std::fmt;

use log::trace;

/// Append-only IR stream plus the name generators shared by a whole compilation unit.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    globals: String,
    code: String,
    register_index: usize,
    label_index: usize,
    strings: HashMap<String, String>,
    string_lengths: HashMap<String, usize>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_var(&mut self) -> String {
        let s = format!("%t{}", self.register_index);
        self.register_index += 1;
        s
    }

    pub fn fresh_label(&mut self) -> String {
        let s = format!("label_{}", self.label_index);
        self.label_index += 1;
        s
    }

    /// Pools `value` as a global constant and returns its name (`@.str.N`).
    pub fn emit_string(&mut self, value: &str) -> String {
        if let Some(name) = self.strings.get(value) {
            return name.clone();
        }

        let name = format!("@.str.{}", self.strings.len());
        let len = value.len() + 1;
        self.emit_global(&format!(
            "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
            name,
            len,
            escape(value)
        ));
        self.strings.insert(value.to_string(), name.clone());
        self.string_lengths.insert(name.clone(), len);
        name
    }

    /// LLVM array type of a pooled string, e.g. `[6 x i8]`.
    pub fn string_type(&self, name: &str) -> Option<String> {
        self.string_lengths
            .get(name)
            .map(|len| format!("[{} x i8]", len))
    }

    /// Appends one indented instruction.
    pub fn emit(&mut self, instruction: &str) {
        trace!("emit: {}", instruction);
        self.code.push_str("  ");
        self.code.push_str(instruction);
        self.code.push('\n');
    }

    pub fn emit_label(&mut self, label: &str) {
        trace!("emit: {}:", label);
        self.code.push_str(label);
        self.code.push_str(":\n");
    }

    /// Appends `text` verbatim, for function headers and other non-instruction lines.
    pub fn emit_raw(&mut self, text: &str) {
        self.code.push_str(text);
        if !text.ends_with('\n') {
            self.code.push('\n');
        }
    }

    pub fn emit_global(&mut self, text: &str) {
        trace!("emit global: {}", text);
        self.globals.push_str(text);
        self.globals.push('\n');
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn globals(&self) -> &str {
        &self.globals
    }
}

impl fmt::Display for CodeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.globals, self.code)
    }
}

fn escape(s: &str) -> String {
    let mut escaped = String::new();
    for c in s.bytes() {
        match c {
            b'\\' | b'"' => escaped.push_str(&format!("\\{:02X}", c)),
            32..=126 => escaped.push(c as char),
            _ => escaped.push_str(&format!("\\{:02X}", c)),
        }
    }
    escaped
}
