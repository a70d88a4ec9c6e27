use crate::illustration::IllustrationRequest;

/// How one expected character of the current page should be shown.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CharClass {
    Matched,
    Mismatched,
    /// The next character to type. At most one per page.
    Active,
    Pending,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct RenderCell {
    pub expected: char,
    pub display: char,
    pub class: CharClass,
}

impl RenderCell {
    pub fn new(expected: char, class: CharClass) -> Self {
        Self {
            expected,
            display: display_char(expected),
            class,
        }
    }
}

/// Everything needed to draw the typing screen, derived from a `Session`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderModel {
    pub key: String,
    pub cells: Vec<RenderCell>,
    pub typed_count: usize,
    pub error_count: usize,
    /// 1-based
    pub page_number: usize,
    pub page_count: usize,
    pub illustration: Option<IllustrationRequest>,
}

impl RenderModel {
    pub fn status_line(&self) -> String {
        format!(
            "Characters: {} | Errors: {}",
            self.typed_count, self.error_count
        )
    }

    pub fn page_label(&self) -> String {
        format!("Page {} / {}", self.page_number, self.page_count)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.cells.iter().position(|c| c.class == CharClass::Active)
    }

    /// Runs of consecutive cells sharing a class, as `(class, text)`.
    pub fn runs(&self) -> Vec<(CharClass, String)> {
        let mut runs: Vec<(CharClass, String)> = Vec::new();
        for cell in &self.cells {
            match runs.last_mut() {
                Some((class, text)) if *class == cell.class => text.push(cell.display),
                _ => runs.push((cell.class, cell.display.to_string())),
            }
        }
        runs
    }
}

/// Line breaks and tabs would leave holes in the wrapped paragraph.
fn display_char(c: char) -> char {
    match c {
        '\n' | '\r' | '\t' => ' ',
        c => c,
    }
}
