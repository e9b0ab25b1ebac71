//! Transcript export for the clipboard widget.

use super::store::Turn;

use minijinja::{AutoEscape, Environment, Value, context};
use serde::Serialize;

/// Render turns as `"<role>: <text>\n"` lines in insertion order.
pub fn render(history: &[Turn]) -> String {
    let mut output = String::new();
    for turn in history {
        output.push_str(turn.role().as_str());
        output.push_str(": ");
        output.push_str(turn.text());
        output.push('\n');
    }
    output
}

/// Encode text as a JavaScript string literal that is safe inside an inline
/// `<script>` element.
///
/// JSON handles quotes, backslashes and control characters. `</` is broken up
/// so the transcript cannot close the surrounding script element, and the
/// line separators JSON leaves raw are escaped for older JS engines.
pub fn script_literal(text: &str) -> String {
    let json = serde_json::Value::String(text.to_owned()).to_string();
    json.replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Cosmetic options for the copy button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardOptions {
    pub button_label: String,
    pub tooltip: String,
    pub copied_label: String,
    pub icon: String,
}

impl Default for ClipboardOptions {
    fn default() -> Self {
        Self {
            button_label: "Copy to Clipboard".into(),
            tooltip: "Copy transcript".into(),
            copied_label: "Copied!".into(),
            icon: "📋".into(),
        }
    }
}

const WIDGET_NAME: &str = "clipboard.html";
const WIDGET_TEMPLATE: &str = include_str!("../../interface/clipboard.html");

/// The HTML document that hands a transcript to the browser clipboard.
#[derive(Debug, Clone)]
pub struct ClipboardWidget {
    options: ClipboardOptions,
    env: Environment<'static>,
}

impl ClipboardWidget {
    pub fn new(options: ClipboardOptions) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_name| AutoEscape::Html);
        env.add_template(WIDGET_NAME, WIDGET_TEMPLATE)?;
        Ok(Self { options, env })
    }

    pub fn options(&self) -> &ClipboardOptions {
        &self.options
    }

    /// Fill the widget template with the labels and the transcript. Labels
    /// are HTML-escaped; the transcript is already a script-safe literal.
    pub fn render(&self, transcript: &str) -> Result<String, minijinja::Error> {
        self.env.get_template(WIDGET_NAME)?.render(context! {
            button_label => &self.options.button_label,
            tooltip => &self.options.tooltip,
            copied_label => &self.options.copied_label,
            icon => &self.options.icon,
            copy_text => Value::from_safe_string(script_literal(transcript)),
        })
    }
}
