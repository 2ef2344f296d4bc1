//! Print-ready HTML rendering (§4.10), ported from the original's in-tree
//! Markdown-to-HTML converter: headings, bold/italic, un/ordered lists,
//! blockquotes, horizontal rules, paragraph fallback. No external Markdown
//! dependency — the input shape is fully controlled by [`crate::markdown`].

pub fn render_print_html(markdown: &str, company_name: &str, session_type: &str) -> String {
    let body = md_to_html(markdown);
    let type_label = if session_type == "interview" { "Interview" } else { "Consultation" };
    let title = if company_name.is_empty() { "Anketa" } else { company_name };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title_escaped}</title>
<style>
  @page {{ margin: 2cm; }}
  body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
    max-width: 800px; margin: 0 auto; padding: 2rem;
    color: #1a1a2e; line-height: 1.6; font-size: 14px;
  }}
  .header {{ border-bottom: 2px solid #6366f1; padding-bottom: 1rem; margin-bottom: 2rem; }}
  .header h1 {{ color: #6366f1; margin: 0 0 0.25rem; font-size: 1.5rem; }}
  .header .meta {{ color: #666; font-size: 0.85rem; }}
  h2 {{ color: #312e81; border-bottom: 1px solid #e5e7eb; padding-bottom: 0.5rem; margin-top: 2rem; }}
  h3 {{ color: #4338ca; margin-top: 1.5rem; }}
  ul, ol {{ padding-left: 1.5rem; }}
  li {{ margin-bottom: 0.25rem; }}
  strong {{ color: #1e1b4b; }}
  table {{ width: 100%; border-collapse: collapse; margin: 1rem 0; }}
  th, td {{ border: 1px solid #e5e7eb; padding: 0.5rem 0.75rem; text-align: left; }}
  th {{ background: #f3f4f6; font-weight: 600; }}
  blockquote {{
    border-left: 3px solid #6366f1; margin: 1rem 0; padding: 0.5rem 1rem;
    background: #f8f7ff; font-style: italic;
  }}
  .print-btn {{
    position: fixed; top: 1rem; right: 1rem; padding: 0.5rem 1.5rem;
    background: #6366f1; color: white; border: none; border-radius: 0.5rem;
    cursor: pointer; font-size: 0.9rem; z-index: 100;
  }}
  .print-btn:hover {{ background: #4f46e5; }}
  @media print {{
    .print-btn {{ display: none; }}
    body {{ padding: 0; max-width: none; }}
  }}
</style>
</head>
<body>
<button class="print-btn" onclick="window.print()">Save as PDF</button>
<div class="header">
  <h1>{title_escaped}</h1>
  <div class="meta">{type_label}</div>
</div>
{body}
</body>
</html>"#,
        title_escaped = escape(title),
    )
}

fn md_to_html(md: &str) -> String {
    if md.is_empty() {
        return "<p>Anketa is empty</p>".to_string();
    }

    let mut parts = Vec::new();
    let mut in_list = false;
    let mut in_ol = false;
    let mut in_blockquote = false;

    for line in md.lines() {
        let stripped = line.trim();

        if in_list && !stripped.starts_with("- ") && !stripped.starts_with("* ") {
            parts.push("</ul>".to_string());
            in_list = false;
        }
        if in_ol && !is_ordered_item(stripped) {
            parts.push("</ol>".to_string());
            in_ol = false;
        }
        if in_blockquote && !stripped.starts_with('>') {
            parts.push("</blockquote>".to_string());
            in_blockquote = false;
        }

        if stripped.is_empty() {
            continue;
        }

        if let Some(rest) = stripped.strip_prefix("#### ") {
            parts.push(format!("<h4>{}</h4>", inline(rest)));
        } else if let Some(rest) = stripped.strip_prefix("### ") {
            parts.push(format!("<h3>{}</h3>", inline(rest)));
        } else if let Some(rest) = stripped.strip_prefix("## ") {
            parts.push(format!("<h2>{}</h2>", inline(rest)));
        } else if let Some(rest) = stripped.strip_prefix("# ") {
            parts.push(format!("<h1>{}</h1>", inline(rest)));
        } else if let Some(rest) = stripped.strip_prefix('>') {
            if !in_blockquote {
                parts.push("<blockquote>".to_string());
                in_blockquote = true;
            }
            parts.push(format!("<p>{}</p>", inline(rest.trim())));
        } else if let Some(rest) = stripped.strip_prefix("- ").or_else(|| stripped.strip_prefix("* ")) {
            if !in_list {
                parts.push("<ul>".to_string());
                in_list = true;
            }
            parts.push(format!("<li>{}</li>", inline(rest)));
        } else if is_ordered_item(stripped) {
            if !in_ol {
                parts.push("<ol>".to_string());
                in_ol = true;
            }
            let text = stripped.split_once(". ").map(|(_, rest)| rest).unwrap_or(stripped);
            parts.push(format!("<li>{}</li>", inline(text)));
        } else if stripped == "---" || stripped == "***" || stripped == "___" {
            parts.push("<hr>".to_string());
        } else if stripped.starts_with('|') {
            parts.push(format!("<p>{}</p>", inline(stripped)));
        } else {
            parts.push(format!("<p>{}</p>", inline(stripped)));
        }
    }

    if in_list {
        parts.push("</ul>".to_string());
    }
    if in_ol {
        parts.push("</ol>".to_string());
    }
    if in_blockquote {
        parts.push("</blockquote>".to_string());
    }

    parts.join("\n")
}

fn is_ordered_item(line: &str) -> bool {
    let Some(dot) = line.find(". ") else { return false };
    dot <= 3 && line[..dot].chars().all(|c| c.is_ascii_digit()) && !line[..dot].is_empty()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Bold/italic inline markdown, applied after HTML-escaping so literal `<`
/// in source text can never reintroduce a tag.
fn inline(text: &str) -> String {
    let escaped = escape(text);
    let bold = replace_paired(&escaped, "**", "strong");
    replace_paired(&bold, "*", "em")
}

fn replace_paired(text: &str, marker: &str, tag: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    loop {
        let Some(start) = rest.find(marker) else {
            out.push_str(rest);
            break;
        };
        let after_start = &rest[start + marker.len()..];
        let Some(end) = after_start.find(marker) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&format!("<{tag}>{}</{tag}>", &after_start[..end]));
        rest = &after_start[end + marker.len()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_markdown_renders_placeholder_paragraph() {
        let html = render_print_html("", "Acme", "consultation");
        assert!(html.contains("Anketa is empty"));
    }

    #[test]
    fn headings_and_lists_convert() {
        let md = "# Title\n\n- one\n- two\n\nplain paragraph";
        let html = render_print_html(md, "Acme", "consultation");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<p>plain paragraph</p>"));
    }

    #[test]
    fn angle_brackets_in_source_text_are_escaped() {
        let md = "value < 10 and > 5";
        let html = render_print_html(md, "Acme", "consultation");
        assert!(html.contains("&lt;"));
        assert!(html.contains("&gt;"));
        assert!(!html.contains("<10"));
    }

    #[test]
    fn bold_and_italic_render_as_tags() {
        let html = render_print_html("**bold** and *italic*", "Acme", "consultation");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn save_as_pdf_button_present_and_hidden_on_print() {
        let html = render_print_html("body", "Acme", "consultation");
        assert!(html.contains("Save as PDF"));
        assert!(html.contains("@media print"));
    }
}
