use crate::render::palette;
use crate::render::svg::{fmt_num, xml_escape, Anchor, Document, Rect, Text, SVG_NS};
use crate::render::CardKind;

const FONT_SIZE: f64 = 16.0;
const LINE_HEIGHT: f64 = 22.0;

/// Placeholder image carrying `message`, sized for the card it replaces.
pub fn render(kind: CardKind, message: &str) -> String {
    let (width, height) = kind.size();
    render_sized(width, height, message)
}

/// Never fails: a document built from fixed coordinates always serializes,
/// and the literal below covers the impossible case anyway.
pub fn render_sized(width: f64, height: f64, message: &str) -> String {
    match document(width, height, message).to_svg() {
        Ok(svg) => svg,
        Err(_) => {
            let (w, h) = (fmt_num(width), fmt_num(height));
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <svg xmlns=\"{SVG_NS}\" width=\"{w}\" height=\"{h}\" \
                 viewBox=\"0 0 {w} {h}\">\
                 <text x=\"50%\" y=\"50%\" text-anchor=\"middle\">{}</text></svg>\n",
                xml_escape(message)
            )
        }
    }
}

fn document(width: f64, height: f64, message: &str) -> Document {
    let mut doc = Document::new(width, height).title(message);

    doc.push(
        Rect::new(0.5, 0.5, width - 1.0, height - 1.0)
            .fill(palette::BACKGROUND)
            .stroke(palette::BORDER, 1.0)
            .radius(6.0),
    );

    // roughly 0.55em per glyph
    let max_chars = ((width - 40.0) / (FONT_SIZE * 0.55)).max(10.0) as usize;
    let lines = wrap(message, max_chars);
    let first_y = height / 2.0 - (lines.len() as f64 - 1.0) * LINE_HEIGHT / 2.0 + FONT_SIZE / 3.0;

    for (i, line) in lines.into_iter().enumerate() {
        doc.push(
            Text::new(width / 2.0, first_y + i as f64 * LINE_HEIGHT, line)
                .size(FONT_SIZE)
                .fill(palette::TEXT_MUTED)
                .anchor(Anchor::Middle),
        );
    }

    doc
}

/// Greedy word wrap; words longer than `max_chars` are split.
fn wrap(message: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in message.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_follow_card_kind() {
        let svg = render(CardKind::Graph, "boom");
        assert!(svg.contains(r#"width="900" height="420""#));

        let svg = render(CardKind::Heatmap, "boom");
        assert!(svg.contains(r#"viewBox="0 0 700 250""#));
    }

    #[test]
    fn test_message_is_escaped() {
        let svg = render(CardKind::Profile, "<script> & 'quotes'");
        assert!(svg.contains("&lt;script&gt; &amp; &apos;quotes&apos;"));
        assert!(!svg.contains("<script>"));
    }

    #[test]
    fn test_wrap_long_messages() {
        let lines = wrap("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);

        let lines = wrap(&"x".repeat(25), 10);
        assert_eq!(lines.len(), 3);
        assert_eq!(wrap("", 10), vec![String::new()]);
    }
}
