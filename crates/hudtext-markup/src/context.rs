//! Per-pass compilation state.
//!
//! A [`ParserContext`] carries everything a tag handler may read or change:
//! the output buffer, running line measurements, the size stack, color
//! depth, case mode, and the tags that must be closed when the pass ends.
//! One context serves exactly one compilation pass.

use crate::metrics::{advance, LayoutMetrics};
use crate::tags::{TagHandler, CLOSE_COLOR, CLOSE_NOPARSE, CLOSE_SIZE};

/// The active letter-case transformation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaseStyle {
    #[default]
    Normal,
    Uppercase,
    Lowercase,
    Smallcaps,
}

impl CaseStyle {
    /// The tag name written to the output for this case, if any.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            CaseStyle::Normal => None,
            CaseStyle::Uppercase => Some("allcaps"),
            CaseStyle::Lowercase => Some("lowercase"),
            CaseStyle::Smallcaps => Some("smallcaps"),
        }
    }
}

/// Result of a compilation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledText {
    /// Normalized, balanced output ready for transmission.
    pub text: String,
    /// Whether some unbreakable run exceeded the usable line width.
    pub overflowed: bool,
    /// Number of lines, counting wrapped lines and the final open line.
    pub lines: usize,
    /// Total vertical extent of all lines, in pixels.
    pub height: f32,
}

/// Mutable state threaded through the tag handlers during one pass.
#[derive(Clone)]
pub struct ParserContext {
    metrics: LayoutMetrics,
    output: String,
    size: f32,
    size_stack: Vec<f32>,
    current_line_width: f32,
    width_since_space: f32,
    space_on_line: bool,
    current_line_height: f32,
    completed_height: f32,
    completed_lines: usize,
    color_depth: usize,
    case: CaseStyle,
    ending_tags: Vec<&'static dyn TagHandler>,
    should_parse: bool,
    no_break: bool,
    overflowed: bool,
    trailing_line_height: Option<f32>,
}

impl Default for ParserContext {
    fn default() -> Self {
        Self::new(LayoutMetrics::default())
    }
}

impl ParserContext {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            output: String::new(),
            size: metrics.default_size,
            size_stack: Vec::new(),
            current_line_width: 0.0,
            width_since_space: 0.0,
            space_on_line: false,
            current_line_height: metrics.default_line_height,
            completed_height: 0.0,
            completed_lines: 0,
            color_depth: 0,
            case: CaseStyle::Normal,
            ending_tags: Vec::with_capacity(8),
            should_parse: true,
            no_break: false,
            overflowed: false,
            trailing_line_height: None,
        }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Output emitted so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Sizes saved by currently open `<size>` scopes, innermost last.
    pub fn size_stack(&self) -> &[f32] {
        &self.size_stack
    }

    pub fn current_line_width(&self) -> f32 {
        self.current_line_width
    }

    pub fn width_since_space(&self) -> f32 {
        self.width_since_space
    }

    pub fn current_line_height(&self) -> f32 {
        self.current_line_height
    }

    pub fn color_depth(&self) -> usize {
        self.color_depth
    }

    pub fn case(&self) -> CaseStyle {
        self.case
    }

    pub fn should_parse(&self) -> bool {
        self.should_parse
    }

    pub fn no_break(&self) -> bool {
        self.no_break
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Appends a tag marker. Markers take no horizontal space.
    pub fn emit(&mut self, marker: &str) {
        self.output.push_str(marker);
    }

    /// Appends literal text, measuring every character.
    pub fn write_text(&mut self, text: &str) {
        for c in text.chars() {
            self.output.push(c);
            if c == '\n' {
                self.line_break();
            } else {
                self.measure(c);
            }
        }
    }

    /// Ends the current line without emitting anything.
    pub fn line_break(&mut self) {
        self.completed_height += self.current_line_height;
        self.completed_lines += 1;
        self.current_line_width = 0.0;
        self.width_since_space = 0.0;
        self.space_on_line = false;
    }

    /// Enters a size scope, saving the current size for the matching close.
    pub fn push_size(&mut self, size: f32) {
        self.size_stack.push(self.size);
        self.size = size;
    }

    /// Leaves the innermost size scope. Returns `false` if none was open.
    pub fn pop_size(&mut self) -> bool {
        match self.size_stack.pop() {
            Some(previous) => {
                self.size = previous;
                true
            }
            None => false,
        }
    }

    pub fn set_line_height(&mut self, height: f32) {
        self.current_line_height = height.max(0.0);
    }

    pub fn enter_color(&mut self) {
        self.color_depth += 1;
    }

    /// Leaves the innermost color scope. Returns `false` if none was open.
    pub fn exit_color(&mut self) -> bool {
        if self.color_depth == 0 {
            return false;
        }
        self.color_depth -= 1;
        true
    }

    pub fn set_case(&mut self, case: CaseStyle) {
        self.case = case;
    }

    pub fn set_should_parse(&mut self, should_parse: bool) {
        self.should_parse = should_parse;
    }

    pub fn set_no_break(&mut self, no_break: bool) {
        self.no_break = no_break;
    }

    /// Registers a handler to run when the pass ends. Already-registered
    /// handlers are not added twice.
    pub fn add_ending_tag(&mut self, tag: &'static dyn TagHandler) {
        if !self.has_ending_tag(tag) {
            self.ending_tags.push(tag);
        }
    }

    pub fn remove_ending_tag(&mut self, tag: &dyn TagHandler) {
        self.ending_tags.retain(|t| t.names() != tag.names());
    }

    pub fn has_ending_tag(&self, tag: &dyn TagHandler) -> bool {
        self.ending_tags.iter().any(|t| t.names() == tag.names())
    }

    /// Closes every scope still open: an open `noparse` first, so that the
    /// markers after it are interpreted, then pending ending tags in
    /// registration order, then one size close per saved size, then
    /// remaining colors.
    pub fn apply_closing_tags(&mut self) {
        // The last line keeps the height it was written with.
        self.trailing_line_height = Some(self.current_line_height);

        if !self.should_parse {
            CLOSE_NOPARSE.handle(self, None);
        }

        let ending = self.ending_tags.clone();
        for tag in ending {
            tag.handle(self, None);
        }

        for _ in 0..self.size_stack.len() {
            CLOSE_SIZE.handle(self, None);
        }

        for _ in 0..self.color_depth {
            CLOSE_COLOR.handle(self, None);
        }

        self.size_stack.clear();
        self.ending_tags.clear();
    }

    /// Takes the output and final measurements out of the context.
    pub fn finish(&mut self) -> CompiledText {
        CompiledText {
            text: std::mem::take(&mut self.output),
            overflowed: self.overflowed,
            lines: self.completed_lines + 1,
            height: self.completed_height
                + self
                    .trailing_line_height
                    .unwrap_or(self.current_line_height),
        }
    }

    fn measure(&mut self, c: char) {
        let width = self.char_width(c);
        self.current_line_width += width;
        self.width_since_space += width;

        if c == ' ' {
            self.width_since_space = 0.0;
            self.space_on_line = true;
        }

        if self.current_line_width > self.metrics.display_width {
            self.wrap_or_overflow();
        }
    }

    fn wrap_or_overflow(&mut self) {
        if self.no_break || !self.space_on_line {
            self.overflowed = true;
            return;
        }

        // The renderer moves the current word onto a new line.
        let carried = self.width_since_space;
        self.line_break();
        self.current_line_width = carried;
        self.width_since_space = carried;

        if carried > self.metrics.display_width {
            self.overflowed = true;
        }
    }

    fn char_width(&self, c: char) -> f32 {
        match self.case {
            CaseStyle::Normal => advance(c) * self.size,
            CaseStyle::Uppercase => c.to_uppercase().map(advance).sum::<f32>() * self.size,
            CaseStyle::Lowercase => c.to_lowercase().map(advance).sum::<f32>() * self.size,
            CaseStyle::Smallcaps if c.is_lowercase() => {
                c.to_uppercase().map(advance).sum::<f32>()
                    * self.size
                    * self.metrics.smallcaps_ratio
            }
            CaseStyle::Smallcaps => advance(c) * self.size,
        }
    }
}

impl std::fmt::Debug for ParserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ending: Vec<&str> = self
            .ending_tags
            .iter()
            .filter_map(|t| t.names().first().copied())
            .collect();
        f.debug_struct("ParserContext")
            .field("size", &self.size)
            .field("size_stack", &self.size_stack)
            .field("current_line_width", &self.current_line_width)
            .field("current_line_height", &self.current_line_height)
            .field("color_depth", &self.color_depth)
            .field("case", &self.case)
            .field("ending_tags", &ending)
            .field("should_parse", &self.should_parse)
            .field("no_break", &self.no_break)
            .field("overflowed", &self.overflowed)
            .finish_non_exhaustive()
    }
}
