//! Widget form rendering.

use axum::response::Html;

use hcaptcha_common::constants::WIDGET_SCRIPT_URL;

/// Minimal form posting the widget token to `action`.
pub fn parse_form(site_key: &str, action: &str) -> String {
    format!(
        r#"<form action="{action}" method="POST">
    <script src="{WIDGET_SCRIPT_URL}" async defer></script>
    <div class="h-captcha" data-sitekey="{site_key}"></div>
    <input type="submit" name="button" value="OK">
</form>"#,
        action = escape_attr(action),
        site_key = escape_attr(site_key),
    )
}

pub fn render_form(site_key: &str, action: &str) -> Html<String> {
    Html(parse_form(site_key, action))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
