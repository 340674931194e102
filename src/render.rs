use once_cell::sync::Lazy;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use regex::{Captures, Regex};

static CLOZE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{c(\d+)::(.+?)\}\}").expect("valid cloze regex"));

/// Replace every `{{cN::...}}` marker with its display form: an underscore
/// placeholder while hidden, the bracketed deletion content once revealed.
pub fn substitute_cloze_markers(text: &str, reveal: bool) -> String {
    CLOZE_MARKER
        .replace_all(text, |captures: &Captures| {
            let content = &captures[2];
            if reveal {
                format!("[{content}]")
            } else {
                let placeholder = "_".repeat(content.chars().count().max(3));
                format!("[{placeholder}]")
            }
        })
        .into_owned()
}

/// Render card text for the terminal. The only markup honored is the
/// restricted inline subset (`<b>`, `<i>`); anything else is shown verbatim.
pub fn render_card_text(text: &str, reveal: bool) -> Text<'static> {
    let substituted = substitute_cloze_markers(text, reveal);

    let mut lines: Vec<Line> = Vec::new();
    let mut current_line: Vec<Span> = Vec::new();
    let mut pending = String::new();
    let mut style = Style::default();

    let mut rest = substituted.as_str();
    while !rest.is_empty() {
        if let Some((tag_len, new_style)) = match_tag(rest, style) {
            flush_pending(&mut current_line, &mut pending, style);
            style = new_style;
            rest = &rest[tag_len..];
            continue;
        }

        let ch = rest.chars().next().expect("non-empty rest");
        if ch == '\n' {
            flush_pending(&mut current_line, &mut pending, style);
            lines.push(Line::from(std::mem::take(&mut current_line)));
        } else {
            pending.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }

    flush_pending(&mut current_line, &mut pending, style);
    if !current_line.is_empty() {
        lines.push(Line::from(current_line));
    }

    Text::from(lines)
}

fn match_tag(rest: &str, style: Style) -> Option<(usize, Style)> {
    const TAGS: [(&str, bool, Modifier); 4] = [
        ("<b>", true, Modifier::BOLD),
        ("</b>", false, Modifier::BOLD),
        ("<i>", true, Modifier::ITALIC),
        ("</i>", false, Modifier::ITALIC),
    ];
    for (tag, opens, modifier) in TAGS {
        if rest
            .get(..tag.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(tag))
        {
            let new_style = if opens {
                style.add_modifier(modifier)
            } else {
                style.remove_modifier(modifier)
            };
            return Some((tag.len(), new_style));
        }
    }
    None
}

fn flush_pending(current_line: &mut Vec<Span<'static>>, pending: &mut String, style: Style) {
    if pending.is_empty() {
        return;
    }
    current_line.push(Span::styled(std::mem::take(pending), style));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(text: &Text<'_>) -> String {
        text.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn bold_and_italic_tags_become_styled_spans() {
        let text = render_card_text("plain <b>bold</b> and <i>italic</i>", true);
        assert_eq!(flatten(&text), "plain bold and italic");

        let line = &text.lines[0];
        let bold_span = line
            .spans
            .iter()
            .find(|span| span.content == "bold")
            .expect("bold span");
        assert!(bold_span.style.add_modifier.contains(Modifier::BOLD));

        let italic_span = line
            .spans
            .iter()
            .find(|span| span.content == "italic")
            .expect("italic span");
        assert!(italic_span.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn unknown_tags_are_shown_verbatim() {
        let text = render_card_text("a <u>b</u>", true);
        assert_eq!(flatten(&text), "a <u>b</u>");
    }

    #[test]
    fn newlines_split_lines() {
        let text = render_card_text("front\nback", true);
        assert_eq!(text.lines.len(), 2);
    }

    #[test]
    fn hidden_cloze_is_masked_with_placeholder() {
        let masked = substitute_cloze_markers("Water boils at {{c1::100}} degrees.", false);
        assert_eq!(masked, "Water boils at [___] degrees.");

        let masked = substitute_cloze_markers("{{c1::a longer deletion}} here", false);
        assert_eq!(masked, "[_________________] here");
    }

    #[test]
    fn revealed_cloze_shows_bracketed_content() {
        let revealed = substitute_cloze_markers("Water boils at {{c1::100}} degrees.", true);
        assert_eq!(revealed, "Water boils at [100] degrees.");
    }

    #[test]
    fn multiple_deletion_groups_coexist() {
        let masked = substitute_cloze_markers("{{c1::Paris}} is in {{c2::France}}.", false);
        assert_eq!(masked, "[_____] is in [______].");
    }

    #[test]
    fn masking_handles_unicode_content() {
        let masked = substitute_cloze_markers("Capital of 日本 is {{c1::東京}}", false);
        assert_eq!(masked, "Capital of 日本 is [___]");
    }
}
