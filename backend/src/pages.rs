//! The HTML front page and its embedded assets.

use include_dir::{include_dir, Dir};
use shared::models::Event;

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Returns an embedded asset by its path under `static/`.
pub fn asset(path: &str) -> Option<&'static [u8]> {
    STATIC_DIR.get_file(path).map(|file| file.contents())
}

/// Renders the front page.
///
/// With `events` the list is rendered on the server with a vote form per
/// event. Without, the page ships empty and the script fetches `/events`.
pub fn render_index(events: Option<&[Event]>) -> String {
    let template = STATIC_DIR
        .get_file("index.html")
        .and_then(|file| file.contents_utf8())
        .unwrap_or_default();

    let (mode, items) = match events {
        Some(events) => ("server", events.iter().map(render_event).collect::<String>()),
        None => ("client", String::new()),
    };

    template.replace("{{render}}", mode).replace("{{events}}", &items)
}

fn render_event(event: &Event) -> String {
    let voters = event
        .votes
        .iter()
        .map(|email| format!("<li>{}</li>", escape(email)))
        .collect::<String>();

    format!(
        r#"<li class="event"><h2>{title}</h2><p class="meta">{date} · Votes ({count})</p><p>{description}</p><ul class="voters">{voters}</ul><form method="post" action="/vote/{id}"><input name="email" type="email" placeholder="you@example.com"><button type="submit">Vote</button></form></li>"#,
        id = event.id,
        title = escape(&event.title),
        date = escape(&event.date),
        count = event.total_votes(),
        description = escape(&event.description),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, votes: &[&str]) -> Event {
        Event {
            id: 1,
            title: title.into(),
            description: "Q3 planning".into(),
            date: "2024-09-01".into(),
            created_at: None,
            votes: votes.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_client_rendered_shell() {
        let page = render_index(None);
        assert!(page.contains(r#"data-render="client""#));
        assert!(page.contains(r#"<ul id="events"></ul>"#));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_server_rendered_list_is_escaped() {
        let events = vec![event("<b>Offsite</b>", &["a@x.com", "b@x.com"])];
        let page = render_index(Some(events.as_slice()));
        assert!(page.contains(r#"data-render="server""#));
        assert!(page.contains("&lt;b&gt;Offsite&lt;/b&gt;"));
        assert!(page.contains("Votes (2)"));
        assert!(page.contains("<li>b@x.com</li>"));
        assert!(page.contains(r#"action="/vote/1""#));
    }

    #[test]
    fn test_assets_are_embedded() {
        assert!(asset("app.js").is_some());
        assert!(asset("style.css").is_some());
        assert!(asset("missing.js").is_none());
    }
}
