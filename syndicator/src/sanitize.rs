//! Markup cleaning applied to article bodies before they are reworded and republished.
//!
//! Comments, `<script>`/`<style>` elements and every attribute other than `style`
//! are removed; structural tags and inline styling survive. The parsed tree is never
//! mutated: the cleaned markup is written out while walking it, so the output is a
//! pure function of the input and cleaning its own output changes nothing.

use regex::{Captures, Regex};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Elements dropped together with their content.
/// `noscript` is parsed as raw text, so its markup would otherwise escape attribute stripping.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are parsed verbatim and must be written back unescaped
const RAW_TEXT_ELEMENTS: &[&str] = &["xmp", "iframe", "noembed", "noframes"];

/// The parser drops one newline right after these start tags; it has to be written back
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

fn html_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"))
}

fn css_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid css comment regex"))
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style.*?>.*?</style>").expect("valid style regex"))
}

fn script_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid script regex"))
}

/// Strip `/* ... */` comments from a CSS fragment.
pub fn strip_css_comments(css: &str) -> String {
    css_comment_re().replace_all(css, "").into_owned()
}

/// Clean an HTML fragment and return the inner markup of the resulting body.
pub fn clean_html(html: &str) -> String {
    let html = html_comment_re().replace_all(html, "");
    let html = style_block_re().replace_all(&html, |caps: &Captures| strip_css_comments(&caps[0]));
    let html = script_block_re().replace_all(&html, "");
    let html = style_block_re().replace_all(&html, "");

    let document = Html::parse_document(&html);
    let body_selector = match Selector::parse("body") {
        Ok(sel) => sel,
        Err(_) => return String::new(),
    };

    let mut out = String::with_capacity(html.len());
    if let Some(body) = document.select(&body_selector).next() {
        write_children(body, &mut out);
    }
    out
}

fn write_children(parent: ElementRef<'_>, out: &mut String) {
    let raw_text = RAW_TEXT_ELEMENTS.contains(&parent.value().name());
    for child in parent.children() {
        match child.value() {
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => push_escaped(out, text, false),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, out);
                }
            }
            // comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    if let Some(style) = element.value().attr("style") {
        out.push_str(" style=\"");
        push_escaped(out, &strip_css_comments(style), true);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    if LEADING_NEWLINE_ELEMENTS.contains(&name) {
        let starts_with_newline = matches!(
            element.first_child().map(|c| c.value()),
            Some(Node::Text(text)) if text.starts_with('\n')
        );
        if starts_with_newline {
            out.push('\n');
        }
    }

    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_escaped(out: &mut String, text: &str, attr_mode: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
