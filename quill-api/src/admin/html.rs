//! HTML building blocks for the admin pages
//!
//! Every dynamic value goes through [`escape`] before it is written into
//! markup. Values that end up inside attributes are only ever IDs and
//! fixed paths.

use std::fmt::Write as _;

use axum::response::Html;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
header { background: #2b3a55; color: #fff; padding: .6rem 1.2rem; display: flex; gap: 1.2rem; align-items: center; }
header a { color: #fff; text-decoration: none; }
header form { margin-left: auto; }
main { padding: 1.2rem; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #ddd; padding: .35rem .5rem; text-align: left; vertical-align: top; }
th { background: #f3f4f7; }
form.inline { display: inline; }
.muted { color: #888; }
.error { color: #b00020; }
.cards { display: flex; gap: 1rem; flex-wrap: wrap; }
.card { border: 1px solid #ddd; border-radius: 6px; padding: 1rem 1.4rem; min-width: 9rem; }
.card strong { display: block; font-size: 1.6rem; }
.pager { margin-top: 1rem; display: flex; gap: 1rem; }
"#;

/// Escapes text for an HTML text node or a quoted attribute
pub fn escape(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Wraps page content in the admin layout
///
/// `username` is the signed-in staff user; `None` renders the bare layout
/// used by the login page.
pub fn page(title: &str, username: Option<&str>, body: &str) -> Html<String> {
    let nav = match username {
        Some(name) => format!(
            r#"<a href="/admin"><b>Quill admin</b></a>
<a href="/admin/users">Users</a>
<a href="/admin/tokens">Tokens</a>
<a href="/admin/categories">Categories</a>
<a href="/admin/articles">Articles</a>
<a href="/admin/comments">Comments</a>
<form method="post" action="/admin/logout"><span>{}</span> <button type="submit">Log out</button></form>"#,
            escape(name)
        ),
        None => r#"<b>Quill admin</b>"#.to_string(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Quill admin</title>
<style>{STYLE}</style>
</head>
<body>
<header>{nav}</header>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

/// Button that POSTs to `action`
pub fn post_button(action: &str, label: &str) -> String {
    format!(
        r#"<form class="inline" method="post" action="{}"><button type="submit">{}</button></form>"#,
        escape(action),
        escape(label)
    )
}

/// Simple table; cells are raw HTML and must already be escaped
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn render(&self) -> String {
        let mut html = String::from("<table>\n<thead><tr>");
        for header in &self.headers {
            let _ = write!(html, "<th>{}</th>", escape(header));
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        if self.rows.is_empty() {
            let _ = write!(
                html,
                r#"<tr><td colspan="{}" class="muted">Nothing here yet</td></tr>"#,
                self.headers.len()
            );
        }

        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                let _ = write!(html, "<td>{}</td>", cell);
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>");
        html
    }
}

/// Previous/next links for a paginated listing
pub fn pager(path: &str, page: i64, has_next: bool) -> String {
    let mut html = String::from(r#"<div class="pager">"#);
    if page > 1 {
        let _ = write!(html, r#"<a href="{}?page={}">&larr; Previous</a>"#, escape(path), page - 1);
    }
    let _ = write!(html, r#"<span class="muted">Page {}</span>"#, page);
    if has_next {
        let _ = write!(html, r#"<a href="{}?page={}">Next &rarr;</a>"#, escape(path), page + 1);
    }
    html.push_str("</div>");
    html
}

/// Renders a yes/no flag
pub fn flag(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}
