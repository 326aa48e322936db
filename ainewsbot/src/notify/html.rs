//! Line-oriented conversion of digest text into a styled HTML email body.
//!
//! The digest is expected to be plain prose with section headers
//! ("International News:"), numbered items and "Source:" lines. Parsing is
//! heuristic, not a grammar: malformed input degrades to plain paragraphs
//! and the transform never fails.

/// Convert digest text into HTML body fragments.
///
/// Rules, in order per line:
/// - a blank line closes the current item block
/// - `N. ...` opens a new item block with the line in bold
/// - `Source: ...` renders as an italic citation
/// - a non-numbered line ending in `:` renders as a section heading
/// - anything else is body text, inside the open item or standalone
pub fn digest_to_html(text: &str) -> String {
    let mut out = String::new();
    let mut item_open = false;

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() {
            close_item(&mut out, &mut item_open);
        } else if is_numbered_item(line) {
            close_item(&mut out, &mut item_open);
            out.push_str("<div class=\"item\">\n");
            out.push_str(&format!(
                "<p class=\"item-title\"><strong>{}</strong></p>\n",
                escape(line)
            ));
            item_open = true;
        } else if let Some(source) = line.strip_prefix("Source:") {
            out.push_str(&format!(
                "<p class=\"source\"><em>Source: {}</em></p>\n",
                escape(source.trim())
            ));
        } else if is_section_heading(line) {
            close_item(&mut out, &mut item_open);
            out.push_str(&format!("<h2>{}</h2>\n", escape(line.trim_end_matches(':'))));
        } else {
            out.push_str(&format!("<p>{}</p>\n", escape(line)));
        }
    }

    close_item(&mut out, &mut item_open);
    out
}

/// Wrap the converted digest in the full styled email document.
pub fn render_email(subject: &str, digest_text: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
    body {{
        font-family: Arial, sans-serif;
        line-height: 1.6;
        color: #333;
        max-width: 800px;
        margin: 0 auto;
        padding: 20px;
    }}
    h1 {{
        color: #2c3e50;
        border-bottom: 3px solid #3498db;
        padding-bottom: 10px;
    }}
    h2 {{
        color: #2c3e50;
        margin-top: 24px;
    }}
    .content {{
        background-color: #f9f9f9;
        padding: 20px;
        border-radius: 5px;
        margin-top: 20px;
    }}
    .item {{
        background-color: #ffffff;
        border-left: 4px solid #3498db;
        padding: 12px 16px;
        margin: 12px 0;
        border-radius: 3px;
    }}
    .item-title {{
        margin: 0 0 8px 0;
    }}
    .source {{
        color: #666;
        margin: 8px 0 0 0;
    }}
    .footer {{
        margin-top: 30px;
        padding-top: 20px;
        border-top: 1px solid #ddd;
        font-size: 12px;
        color: #666;
    }}
</style>
</head>
<body>
<h1>{subject}</h1>
<div class="content">
{body}</div>
<div class="footer">
    <p>This email was automatically generated by AI News Bot</p>
    <p>Powered by Anthropic Claude</p>
</div>
</body>
</html>
"#,
        subject = escape(subject),
        body = digest_to_html(digest_text)
    )
}

fn close_item(out: &mut String, item_open: &mut bool) {
    if *item_open {
        out.push_str("</div>\n");
        *item_open = false;
    }
}

/// Matches `^\d+\.\s`.
fn is_numbered_item(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let mut rest = line[digits..].chars();
    rest.next() == Some('.') && rest.next().is_some_and(char::is_whitespace)
}

fn is_section_heading(line: &str) -> bool {
    line.ends_with(':') && !line.starts_with(|c: char| c.is_ascii_digit())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
