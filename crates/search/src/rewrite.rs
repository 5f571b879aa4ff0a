use crate::MappingView;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn bare_selector() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.[_a-zA-Z]+[_a-zA-Z0-9-]*").expect("valid selector pattern"))
}

fn attribute_selector() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?P<open>\[class[*^|~]=")(?P<value>[_a-zA-Z0-9-]*)(?P<close>"\])"#)
            .expect("valid attribute selector pattern")
    })
}

/// Rewrites stylesheets to use cross-version class names.
///
/// Output is escaped for embedding in a fenced code block: after each pass
/// backslashes are doubled and backticks get a leading backslash.
pub struct TextRewriter<'a> {
    view: &'a MappingView,
}

impl<'a> TextRewriter<'a> {
    pub fn new(view: &'a MappingView) -> Self {
        Self { view }
    }

    #[must_use]
    pub fn rewrite(&self, text: &str) -> String {
        let bare = bare_selector().replace_all(text, |caps: &Captures<'_>| {
            let token = &caps[0];
            match self.view.canonical_name(&token[1..]) {
                Some(name) => format!(".{name}"),
                None => token.to_string(),
            }
        });
        let bare = escape_for_code_block(&bare);

        let attributes = attribute_selector().replace_all(&bare, |caps: &Captures<'_>| {
            match self.view.canonical_name(&caps["value"]) {
                Some(name) => format!("{}{name}{}", &caps["open"], &caps["close"]),
                None => caps[0].to_string(),
            }
        });
        escape_for_code_block(&attributes)
    }
}

#[must_use]
pub fn escape_for_code_block(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}
