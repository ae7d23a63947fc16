use hudtext_markup::{Compiler, LayoutMetrics, ParserContext, TagHandler, TagRegistry};
use std::sync::Arc;

struct Shout;

impl TagHandler for Shout {
    fn names(&self) -> &'static [&'static str] {
        &["shout"]
    }

    fn handle(&self, context: &mut ParserContext, _param: Option<&str>) -> bool {
        context.write_text("!!");
        true
    }
}

static SHOUT: Shout = Shout;

#[test]
fn test_mixed_document() {
    let compiler = Compiler::default();
    let input = "<color=#ffcc00><size=200%>Round 3</size></color><br><smallcaps>Objectives</smallcaps>\n\
                 - capture <nobr>point B</nobr>";
    let compiled = compiler.compile(input);

    assert_eq!(
        compiled.text,
        "<color=#ffcc00><size=69.4>Round 3</size></color>\n<smallcaps>Objectives</smallcaps>\n\
         - capture <nobr>point B</nobr>"
    );
    assert_eq!(compiled.lines, 3);
    assert!(!compiled.overflowed);
}

#[test]
fn test_malformed_input_is_repaired() {
    let compiler = Compiler::default();
    let compiled = compiler.compile("</color><size=10><allcaps>x</size></size><lowercase>y<color=red");

    assert_eq!(
        compiled.text,
        "<size=10><allcaps>x</size></allcaps><lowercase>y<color=red</lowercase>"
    );
}

#[test]
fn test_custom_registry() {
    let registry = TagRegistry::with_default_tags().add(&SHOUT);
    let compiler = Compiler::default().with_registry(Arc::new(registry));

    assert_eq!(compiler.compile("hey<shout>").text, "hey!!");
    // The global registry is unaffected.
    assert_eq!(Compiler::default().compile("hey<shout>").text, "hey<shout>");
}

#[test]
fn test_custom_metrics() {
    let metrics = LayoutMetrics {
        default_size: 10.0,
        display_width: 40.0,
        ..LayoutMetrics::default()
    };
    let compiler = Compiler::new(metrics);

    assert_eq!(compiler.compile("<size=50%>a").text, "<size=5>a</size>");
    assert!(compiler.compile("abcdefghij").overflowed);
}

#[test]
fn test_parallel_compilation() {
    let compiler = Compiler::default();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let compiler = compiler.clone();
            std::thread::spawn(move || compiler.compile(&format!("<size={}>n", 10 + i)).text)
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let text = handle.join().unwrap();
        assert_eq!(text, format!("<size={}>n</size>", 10 + i));
    }
}
