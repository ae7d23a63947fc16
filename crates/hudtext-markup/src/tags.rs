//! Tag handlers and the registry that maps tag names to them.
//!
//! Handlers hold no state of their own: everything they change lives in the
//! [`ParserContext`]. Each handler is a zero-sized `static`, and the registry
//! stores `&'static dyn TagHandler` references to them, so compiling never
//! allocates handlers and no mutable state is shared between passes.
//!
//! Closing tags are registered under their name with a leading `/`
//! (`"/size"`). Closing a scope that is not open is a silent no-op that still
//! consumes the tag.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::context::{CaseStyle, ParserContext};
use crate::measurement::Measurement;

/// A unit that interprets one or more tag names.
pub trait TagHandler: Send + Sync {
    /// Names this handler answers to, lowercase. Closing handlers use a
    /// leading `/`.
    fn names(&self) -> &'static [&'static str];

    /// Applies the tag to `context`, emitting normalized output.
    ///
    /// Returns `false` if the tag could not be interpreted (for example a
    /// malformed parameter), in which case the compiler emits it literally.
    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool;
}

// ============================================================================
// Size
// ============================================================================

/// A converted measurement can still overflow to infinity (`1e38em`).
fn valid_measure(pixels: f32) -> bool {
    pixels.is_finite() && pixels >= 0.0
}

pub struct SizeTag;
pub struct CloseSizeTag;

impl TagHandler for SizeTag {
    fn names(&self) -> &'static [&'static str] {
        &["size"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        let Some(measurement) = param.and_then(Measurement::parse) else {
            return false;
        };

        let value = measurement.to_pixels(context.metrics().default_size, context.metrics());
        if !valid_measure(value) {
            return false;
        }

        context.push_size(value);
        context.emit(&format!("<size={value}>"));
        true
    }
}

impl TagHandler for CloseSizeTag {
    fn names(&self) -> &'static [&'static str] {
        &["/size"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if context.pop_size() {
            context.emit("</size>");
        }
        true
    }
}

// ============================================================================
// Line height
// ============================================================================

pub struct LineHeightTag;
pub struct CloseLineHeightTag;

impl TagHandler for LineHeightTag {
    fn names(&self) -> &'static [&'static str] {
        &["line-height"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        let Some(measurement) = param.and_then(Measurement::parse) else {
            return false;
        };

        let value =
            measurement.to_pixels(context.metrics().default_line_height, context.metrics());
        if !valid_measure(value) {
            return false;
        }

        // Line height does not nest; a new value replaces the open one.
        CLOSE_LINE_HEIGHT.handle(context, None);

        context.set_line_height(value);
        context.emit(&format!("<line-height={value}>"));
        context.add_ending_tag(&CLOSE_LINE_HEIGHT);
        true
    }
}

impl TagHandler for CloseLineHeightTag {
    fn names(&self) -> &'static [&'static str] {
        &["/line-height"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if context.has_ending_tag(&CLOSE_LINE_HEIGHT) {
            let default = context.metrics().default_line_height;
            context.set_line_height(default);
            context.emit("</line-height>");
            context.remove_ending_tag(&CLOSE_LINE_HEIGHT);
        }
        true
    }
}

// ============================================================================
// Case
// ============================================================================

/// Opens a case scope. At most one case is active: opening a different one
/// closes the current one first, so markers stay balanced.
pub struct CaseTag {
    style: CaseStyle,
    names: &'static [&'static str],
}

pub struct CloseCaseTag {
    style: CaseStyle,
    names: &'static [&'static str],
}

impl TagHandler for CaseTag {
    fn names(&self) -> &'static [&'static str] {
        self.names
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        if param.is_some() {
            return false;
        }

        if context.case() == self.style {
            return true;
        }

        if let Some(close) = close_case_handler(context.case()) {
            close.handle(context, None);
        }

        let (Some(marker), Some(close)) = (self.style.marker(), close_case_handler(self.style))
        else {
            return true;
        };

        context.set_case(self.style);
        context.emit(&format!("<{marker}>"));
        context.add_ending_tag(close);
        true
    }
}

impl TagHandler for CloseCaseTag {
    fn names(&self) -> &'static [&'static str] {
        self.names
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if context.case() != self.style {
            return true;
        }

        if let Some(marker) = self.style.marker() {
            context.emit(&format!("</{marker}>"));
        }
        context.set_case(CaseStyle::Normal);
        context.remove_ending_tag(self);
        true
    }
}

fn close_case_handler(style: CaseStyle) -> Option<&'static dyn TagHandler> {
    match style {
        CaseStyle::Normal => None,
        CaseStyle::Uppercase => Some(&CLOSE_ALLCAPS),
        CaseStyle::Lowercase => Some(&CLOSE_LOWERCASE),
        CaseStyle::Smallcaps => Some(&CLOSE_SMALLCAPS),
    }
}

// ============================================================================
// Color
// ============================================================================

pub struct ColorTag;
pub struct CloseColorTag;

fn normalize_color(param: &str) -> Option<&str> {
    let value = param.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let valid = match value.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()),
    };

    valid.then_some(value)
}

impl TagHandler for ColorTag {
    fn names(&self) -> &'static [&'static str] {
        &["color"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        let Some(color) = param.and_then(normalize_color) else {
            return false;
        };

        context.enter_color();
        context.emit(&format!("<color={color}>"));
        true
    }
}

impl TagHandler for CloseColorTag {
    fn names(&self) -> &'static [&'static str] {
        &["/color"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if context.exit_color() {
            context.emit("</color>");
        }
        true
    }
}

// ============================================================================
// noparse / nobr / br
// ============================================================================

pub struct NoParseTag;
pub struct CloseNoParseTag;
pub struct NoBreakTag;
pub struct CloseNoBreakTag;
pub struct LineBreakTag;

impl TagHandler for NoParseTag {
    fn names(&self) -> &'static [&'static str] {
        &["noparse"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        if param.is_some() {
            return false;
        }
        if context.should_parse() {
            context.set_should_parse(false);
            context.emit("<noparse>");
            context.add_ending_tag(&CLOSE_NOPARSE);
        }
        true
    }
}

impl TagHandler for CloseNoParseTag {
    fn names(&self) -> &'static [&'static str] {
        &["/noparse"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if !context.should_parse() {
            context.set_should_parse(true);
            context.emit("</noparse>");
            context.remove_ending_tag(&CLOSE_NOPARSE);
        }
        true
    }
}

impl TagHandler for NoBreakTag {
    fn names(&self) -> &'static [&'static str] {
        &["nobr"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        if param.is_some() {
            return false;
        }
        if !context.no_break() {
            context.set_no_break(true);
            context.emit("<nobr>");
            context.add_ending_tag(&CLOSE_NOBR);
        }
        true
    }
}

impl TagHandler for CloseNoBreakTag {
    fn names(&self) -> &'static [&'static str] {
        &["/nobr"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        if context.no_break() {
            context.set_no_break(false);
            context.emit("</nobr>");
            context.remove_ending_tag(&CLOSE_NOBR);
        }
        true
    }
}

impl TagHandler for LineBreakTag {
    fn names(&self) -> &'static [&'static str] {
        &["br"]
    }

    fn handle(&self, context: &mut ParserContext, param: Option<&str>) -> bool {
        if param.is_some() {
            return false;
        }
        context.write_text("\n");
        true
    }
}

// ============================================================================
// Shared instances
// ============================================================================

pub static SIZE: SizeTag = SizeTag;
pub static CLOSE_SIZE: CloseSizeTag = CloseSizeTag;
pub static LINE_HEIGHT: LineHeightTag = LineHeightTag;
pub static CLOSE_LINE_HEIGHT: CloseLineHeightTag = CloseLineHeightTag;
pub static ALLCAPS: CaseTag = CaseTag {
    style: CaseStyle::Uppercase,
    names: &["allcaps", "uppercase"],
};
pub static CLOSE_ALLCAPS: CloseCaseTag = CloseCaseTag {
    style: CaseStyle::Uppercase,
    names: &["/allcaps", "/uppercase"],
};
pub static LOWERCASE: CaseTag = CaseTag {
    style: CaseStyle::Lowercase,
    names: &["lowercase"],
};
pub static CLOSE_LOWERCASE: CloseCaseTag = CloseCaseTag {
    style: CaseStyle::Lowercase,
    names: &["/lowercase"],
};
pub static SMALLCAPS: CaseTag = CaseTag {
    style: CaseStyle::Smallcaps,
    names: &["smallcaps"],
};
pub static CLOSE_SMALLCAPS: CloseCaseTag = CloseCaseTag {
    style: CaseStyle::Smallcaps,
    names: &["/smallcaps"],
};
pub static COLOR: ColorTag = ColorTag;
pub static CLOSE_COLOR: CloseColorTag = CloseColorTag;
pub static NOPARSE: NoParseTag = NoParseTag;
pub static CLOSE_NOPARSE: CloseNoParseTag = CloseNoParseTag;
pub static NOBR: NoBreakTag = NoBreakTag;
pub static CLOSE_NOBR: CloseNoBreakTag = CloseNoBreakTag;
pub static BR: LineBreakTag = LineBreakTag;

static DEFAULT_REGISTRY: Lazy<Arc<TagRegistry>> =
    Lazy::new(|| Arc::new(TagRegistry::with_default_tags()));

// ============================================================================
// Registry
// ============================================================================

/// Maps lowercase tag names to their handlers.
#[derive(Clone, Default)]
pub struct TagRegistry {
    tags: HashMap<&'static str, &'static dyn TagHandler>,
}

impl TagRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in tag.
    pub fn with_default_tags() -> Self {
        let builtin: [&'static dyn TagHandler; 17] = [
            &SIZE,
            &CLOSE_SIZE,
            &LINE_HEIGHT,
            &CLOSE_LINE_HEIGHT,
            &ALLCAPS,
            &CLOSE_ALLCAPS,
            &LOWERCASE,
            &CLOSE_LOWERCASE,
            &SMALLCAPS,
            &CLOSE_SMALLCAPS,
            &COLOR,
            &CLOSE_COLOR,
            &NOPARSE,
            &CLOSE_NOPARSE,
            &NOBR,
            &CLOSE_NOBR,
            &BR,
        ];

        builtin
            .into_iter()
            .fold(Self::new(), |registry, handler| registry.add(handler))
    }

    /// The process-wide registry of built-in tags.
    pub fn global() -> Arc<TagRegistry> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// Registers `handler` under all of its names, replacing earlier entries.
    pub fn add(mut self, handler: &'static dyn TagHandler) -> Self {
        for name in handler.names() {
            self.tags.insert(*name, handler);
        }
        self
    }

    /// Looks up an opening (`closing == false`) or closing tag by name,
    /// ignoring ASCII case.
    pub fn get(&self, name: &str, closing: bool) -> Option<&'static dyn TagHandler> {
        let mut key = String::with_capacity(name.len() + 1);
        if closing {
            key.push('/');
        }
        key.extend(name.chars().map(|c| c.to_ascii_lowercase()));
        self.tags.get(key.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.tags.keys().collect();
        names.sort();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}
