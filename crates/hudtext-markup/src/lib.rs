//! Rich-text tag compiler for fixed-width hint displays.
//!
//! This crate compiles `<tag>`-annotated text into a normalized,
//! always-balanced form suitable for a rich-text renderer, while measuring
//! the result against the display's usable width. It tracks the formatting
//! state that spans tags: nested sizes, the active letter case, line height,
//! color depth, and `noparse`/`nobr` scopes.
//!
//! # Example
//!
//! ```rust
//! use hudtext_markup::Compiler;
//!
//! let compiler = Compiler::default();
//!
//! // Unclosed scopes are closed at the end of the pass.
//! let compiled = compiler.compile("<size=50%><allcaps>hello");
//! assert_eq!(compiled.text, "<size=17.35><allcaps>hello</allcaps></size>");
//! assert!(!compiled.overflowed);
//!
//! // Closing something that was never opened is dropped silently.
//! assert_eq!(compiler.compile("hi</size>").text, "hi");
//!
//! // Unknown and malformed tags pass through literally.
//! assert_eq!(compiler.compile("<blink>x").text, "<blink>x");
//! assert_eq!(compiler.compile("<size=big>x").text, "<size=big>x");
//! ```
//!
//! # Tags
//!
//! | tag | effect |
//! |---|---|
//! | `<size=M>` | font size; restores the previous size on close |
//! | `<line-height=M>` | line height for measurement |
//! | `<allcaps>`, `<uppercase>`, `<lowercase>`, `<smallcaps>` | letter case, one at a time |
//! | `<color=C>` | color, `#rgb[a]`, `#rrggbb[aa]` or a name |
//! | `<noparse>` | everything up to `</noparse>` is literal |
//! | `<nobr>` | no word wrapping |
//! | `<br>` | line break |
//!
//! Measurements (`M`) are pixels by default, or `%` / `em` suffixed.
//!
//! # Failure Policy
//!
//! Compilation is total: malformed syntax, unknown names, invalid parameters
//! and mismatched nesting never produce errors. They degrade to literal text
//! or are resolved by closing scopes at the end of the pass.

mod context;
mod measurement;
pub mod metrics;
pub mod tags;
mod tokenizer;

use std::sync::Arc;

pub use context::{CaseStyle, CompiledText, ParserContext};
pub use measurement::{Measurement, MeasurementUnit};
pub use metrics::LayoutMetrics;
pub use tags::{TagHandler, TagRegistry};

use tokenizer::{Token, Tokenizer};

/// Drives a left-to-right pass over tagged input.
///
/// A compiler is cheap to clone and holds no per-pass state; each call to
/// [`compile`](Compiler::compile) works on its own [`ParserContext`], so one
/// compiler can serve many threads.
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<TagRegistry>,
    metrics: LayoutMetrics,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(LayoutMetrics::default())
    }
}

impl Compiler {
    /// Creates a compiler using the built-in tags.
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            registry: TagRegistry::global(),
            metrics,
        }
    }

    /// Replaces the tag registry.
    pub fn with_registry(mut self, registry: Arc<TagRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Compiles `input` with a fresh context.
    pub fn compile(&self, input: &str) -> CompiledText {
        let mut context = ParserContext::new(self.metrics);
        self.compile_with(input, &mut context)
    }

    /// Compiles `input` using a caller-provided fresh context.
    ///
    /// After the call the context holds the final measurements (size, line
    /// width, case) but its output has been moved into the result.
    pub fn compile_with(&self, input: &str, context: &mut ParserContext) -> CompiledText {
        for token in Tokenizer::new(input) {
            match token {
                Token::Text(text) => context.write_text(text),
                Token::Open { name, param, .. } => {
                    let handled =
                        context.should_parse() && self.dispatch(context, name, param, false);
                    if !handled {
                        self.emit_literal(context, token);
                    }
                }
                Token::Close { name, .. } => {
                    // `</noparse>` is the one tag recognized inside a noparse scope.
                    let parsing = context.should_parse() || name.eq_ignore_ascii_case("noparse");
                    let handled = parsing && self.dispatch(context, name, None, true);
                    if !handled {
                        self.emit_literal(context, token);
                    }
                }
                Token::Invalid(raw) => context.write_text(raw),
            }
        }

        context.apply_closing_tags();
        context.finish()
    }

    fn dispatch(
        &self,
        context: &mut ParserContext,
        name: &str,
        param: Option<&str>,
        closing: bool,
    ) -> bool {
        match self.registry.get(name, closing) {
            Some(handler) => handler.handle(context, param),
            None => false,
        }
    }

    fn emit_literal(&self, context: &mut ParserContext, token: Token<'_>) {
        if context.should_parse() {
            log::trace!("emitting tag literally: {:?}", token);
        }
        context.write_text(token.raw());
    }
}

/// Compiles `input` with the default metrics and built-in tags.
pub fn compile(input: &str) -> CompiledText {
    Compiler::default().compile(input)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn plain_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .,!?:;'\"]{0,60}"
    }

    fn tag_soup() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            Just("<size=20>".to_string()),
            Just("<size=150%>".to_string()),
            Just("</size>".to_string()),
            Just("<allcaps>".to_string()),
            Just("</allcaps>".to_string()),
            Just("<lowercase>".to_string()),
            Just("<smallcaps>".to_string()),
            Just("</smallcaps>".to_string()),
            Just("<color=red>".to_string()),
            Just("</color>".to_string()),
            Just("<line-height=30>".to_string()),
            Just("</line-height>".to_string()),
            Just("<nobr>".to_string()),
            Just("</nobr>".to_string()),
            Just("<br>".to_string()),
            Just("<noparse>".to_string()),
            Just("</noparse>".to_string()),
            Just("<".to_string()),
            Just(">".to_string()),
            "[a-z ]{0,6}",
        ];
        prop::collection::vec(piece, 0..30).prop_map(|pieces| pieces.concat())
    }

    fn balance(text: &str, open: &str, close: &str) -> bool {
        let mut depth: i64 = 0;
        let mut rest = text;
        while !rest.is_empty() {
            if rest.starts_with(close) {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                rest = &rest[close.len()..];
            } else if rest.starts_with(open) {
                depth += 1;
                rest = &rest[open.len()..];
            } else {
                let next = rest.chars().next().map_or(1, char::len_utf8);
                rest = &rest[next..];
            }
        }
        depth == 0
    }

    /// Drops every `<noparse>...</noparse>` region, whose contents are
    /// literal. `None` if a region is left open.
    fn strip_noparse(text: &str) -> Option<String> {
        let mut kept = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("<noparse>") {
            kept.push_str(&rest[..start]);
            let inner = &rest[start + "<noparse>".len()..];
            let end = inner.find("</noparse>")?;
            rest = &inner[end + "</noparse>".len()..];
        }
        kept.push_str(rest);
        Some(kept)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn plain_text_is_identity(content in plain_text()) {
            prop_assert_eq!(out(&content), content);
        }

        #[test]
        fn compile_is_total(input in "\\PC{0,80}") {
            let _ = compile(&input);
        }

        #[test]
        fn scopes_are_balanced(input in tag_soup()) {
            let compiled = compile(&input).text;
            // Closing markers inside a noparse region would be shown as text.
            let stripped = strip_noparse(&compiled);
            prop_assert!(stripped.is_some(), "unclosed noparse: {}", compiled);
            let text = stripped.unwrap_or_default();
            prop_assert!(!text.contains("</noparse>"), "stray noparse close: {}", compiled);
            prop_assert!(balance(&text, "<size=", "</size>"), "size: {}", text);
            prop_assert!(balance(&text, "<color=", "</color>"), "color: {}", text);
            prop_assert!(balance(&text, "<allcaps>", "</allcaps>"), "allcaps: {}", text);
            prop_assert!(balance(&text, "<smallcaps>", "</smallcaps>"), "smallcaps: {}", text);
            prop_assert!(balance(&text, "<lowercase>", "</lowercase>"), "lowercase: {}", text);
            prop_assert!(balance(&text, "<line-height=", "</line-height>"), "line-height: {}", text);
            prop_assert!(balance(&text, "<nobr>", "</nobr>"), "nobr: {}", text);
        }
    }

    fn out(input: &str) -> String {
        compile(input).text
    }
}
