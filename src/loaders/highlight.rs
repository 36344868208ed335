//! Syntax highlighting for text-family previews

use std::sync::OnceLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::core::{Highlighted, Rgb, StyledLine, StyledSegment};

/// Lazy-initialized syntax set (100+ languages)
static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

/// Lazy-initialized theme (base16-ocean.dark)
static THEME: OnceLock<Option<Theme>> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme() -> Option<&'static Theme> {
    THEME
        .get_or_init(|| {
            let ts = ThemeSet::load_defaults();
            ts.themes.get("base16-ocean.dark").cloned()
        })
        .as_ref()
}

fn find_syntax<'a>(ss: &'a SyntaxSet, lang: &str, content: &str) -> &'a SyntaxReference {
    ss.find_syntax_by_token(lang)
        .or_else(|| ss.find_syntax_by_first_line(content.lines().next().unwrap_or("")))
        .unwrap_or_else(|| ss.find_syntax_plain_text())
}

fn plain(content: &str) -> Vec<StyledLine> {
    content
        .lines()
        .map(|line| StyledLine {
            segments: vec![StyledSegment {
                text: line.to_string(),
                color: Rgb(0xc0, 0xc5, 0xce),
            }],
        })
        .collect()
}

/// Highlight `content` as `lang`.
///
/// Unknown languages fall back to first-line detection, then plain text.
pub fn highlight(content: &str, lang: &str) -> Vec<StyledLine> {
    let ss = get_syntax_set();
    let Some(theme) = get_theme() else {
        return plain(content);
    };
    let syntax = find_syntax(ss, lang, content);

    let mut h = HighlightLines::new(syntax, theme);
    let mut styled_lines = Vec::new();

    for line in LinesWithEndings::from(content) {
        let Ok(ranges) = h.highlight_line(line, ss) else {
            return plain(content);
        };
        let segments = ranges
            .iter()
            .map(|(style, text)| StyledSegment {
                text: text.trim_end_matches(['\n', '\r']).to_string(),
                color: Rgb(style.foreground.r, style.foreground.g, style.foreground.b),
            })
            .filter(|s| !s.text.is_empty())
            .collect();
        styled_lines.push(StyledLine { segments });
    }

    styled_lines
}

/// Highlight both ends of a head/tail text preview
pub fn highlight_head_tail(head: &str, tail: &str, lang: &str) -> Highlighted {
    Highlighted {
        head: highlight(head, lang),
        tail: highlight(tail, lang),
    }
}
