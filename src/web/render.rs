//! HTML pages.
//!
//! Pages are assembled as strings. Everything user-supplied goes through
//! [`html_escape`].

use std::fmt::Write;

use crate::domain::{HistoryRecord, Task, TransientMarkers};

/// Stylesheet served at `/static/style.css`.
pub const STYLESHEET: &str = r"body {
    font-family: system-ui, sans-serif;
    max-width: 42rem;
    margin: 2rem auto;
    padding: 0 1rem;
    color: #222;
}
header { display: flex; justify-content: space-between; align-items: baseline; }
.flash { background: #fff4d6; border: 1px solid #e8c66a; padding: 0.5rem 0.75rem; margin: 0.5rem 0; }
.marker { color: #555; margin: 0.25rem 0; }
.marker strong { color: #222; }
ul.tasks { list-style: none; padding: 0; }
ul.tasks li { display: flex; gap: 0.5rem; align-items: center; padding: 0.35rem 0; border-bottom: 1px solid #eee; }
ul.tasks li .title { flex: 1; }
table.history { width: 100%; border-collapse: collapse; }
table.history th, table.history td { text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #eee; }
.action-ADDED { color: #1a7f37; }
.action-DELETED { color: #cf222e; }
.action-UPDATED_OLD, .action-UPDATED_NEW { color: #9a6700; }
";

/// Escape HTML special characters.
#[must_use]
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<link rel=\"stylesheet\" href=\"/static/style.css\">\n\
         </head>\n<body>\n{body}</body>\n</html>\n",
        html_escape(title)
    )
}

fn push_flashes(html: &mut String, flashes: &[String]) {
    for message in flashes {
        let _ = writeln!(html, "<p class=\"flash\">{}</p>", html_escape(message));
    }
}

/// Data behind the task list page.
#[derive(Debug, Clone, Copy)]
pub struct IndexView<'a> {
    pub identity: &'a str,
    pub tasks: &'a [Task],
    pub markers: &'a TransientMarkers,
    pub flashes: &'a [String],
}

#[must_use]
pub fn index_page(view: IndexView<'_>) -> String {
    let mut html = String::new();
    let _ = writeln!(
        html,
        "<header><h1>Tasks</h1><nav>Logged in as <strong>{}</strong> \
         | <a href=\"/history\">History</a> | <a href=\"/logout\">Logout</a></nav></header>",
        html_escape(view.identity)
    );
    push_flashes(&mut html, view.flashes);

    html.push_str(
        "<form method=\"post\" action=\"/\">\
         <input type=\"text\" name=\"task\" placeholder=\"New task\" autofocus>\
         <button type=\"submit\">Add</button></form>\n",
    );

    if let Some(title) = view.markers.recently_added.as_deref() {
        let _ = writeln!(
            html,
            "<p class=\"marker\">Recently added: <strong>{}</strong></p>",
            html_escape(title)
        );
    }
    if let Some(title) = view.markers.recently_deleted.as_deref() {
        let _ = writeln!(
            html,
            "<p class=\"marker\">Recently deleted: <strong>{}</strong></p>",
            html_escape(title)
        );
    }

    let _ = writeln!(html, "<p>Total tasks: {}</p>", view.tasks.len());
    html.push_str("<ul class=\"tasks\">\n");
    for task in view.tasks {
        let id = task.id;
        let title = html_escape(&task.title);
        let _ = writeln!(
            html,
            "<li><span class=\"title\">{title}</span>\
             <form method=\"post\" action=\"/update/{id}\">\
             <input type=\"text\" name=\"updated_task\" value=\"{title}\">\
             <button type=\"submit\">Update</button></form>\
             <a href=\"/delete/{id}\">Delete</a></li>"
        );
    }
    html.push_str("</ul>\n");

    page("Tasks", &html)
}

#[must_use]
pub fn history_page(records: &[HistoryRecord]) -> String {
    let mut html = String::from(
        "<header><h1>History</h1><nav><a href=\"/\">Back to tasks</a></nav></header>\n",
    );

    if records.is_empty() {
        html.push_str("<p>No changes yet.</p>\n");
        return page("History", &html);
    }

    html.push_str(
        "<table class=\"history\">\n<tr><th>Task</th><th>Action</th><th>Time (UTC)</th></tr>\n",
    );
    for record in records {
        let action = record.action.as_str();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"action-{action}\">{action}</td><td>{}</td></tr>",
            html_escape(&record.task_title),
            record.timestamp
        );
    }
    html.push_str("</table>\n");

    page("History", &html)
}

#[must_use]
pub fn login_page(flashes: &[String]) -> String {
    let mut html = String::from("<h1>Login</h1>\n");
    push_flashes(&mut html, flashes);
    html.push_str(
        "<form method=\"post\" action=\"/login\">\
         <input type=\"text\" name=\"username\" placeholder=\"Username\" autofocus>\
         <button type=\"submit\">Login</button></form>\n",
    );
    page("Login", &html)
}

#[must_use]
pub fn session_timeout_page(flashes: &[String]) -> String {
    let mut html = String::from("<h1>Session expired</h1>\n");
    push_flashes(&mut html, flashes);
    html.push_str("<p><a href=\"/login\">Login again</a></p>\n");
    page("Session expired", &html)
}

pub fn not_found_page() -> String {
    page(
        "Not found",
        "<h1>Not found</h1>\n<p><a href=\"/\">Back to tasks</a></p>\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HistoryAction, TaskId, Timestamp};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    fn test_html_escape_special_chars() {
        assert_eq!(
            html_escape("<b>\"milk\" & 'eggs'</b>"),
            "&lt;b&gt;&quot;milk&quot; &amp; &#x27;eggs&#x27;&lt;/b&gt;"
        );
    }

    #[rstest]
    fn test_index_page_shows_tasks_markers_and_total() {
        let tasks = vec![
            Task::new(TaskId::new(1), "buy milk"),
            Task::new(TaskId::new(2), "<script>"),
        ];
        let markers = TransientMarkers {
            recently_added: Some("wash car".to_string()),
            recently_deleted: Some("buy milk".to_string()),
        };

        let html = index_page(IndexView {
            identity: "Marushka",
            tasks: &tasks,
            markers: &markers,
            flashes: &[],
        });

        assert!(html.contains("Total tasks: 2"));
        assert!(html.contains("Recently added: <strong>wash car</strong>"));
        assert!(html.contains("Recently deleted: <strong>buy milk</strong>"));
        assert!(html.contains("action=\"/update/2\""));
        assert!(html.contains("href=\"/delete/1\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[rstest]
    fn test_index_page_hides_empty_markers() {
        let html = index_page(IndexView {
            identity: "Marushka",
            tasks: &[],
            markers: &TransientMarkers::default(),
            flashes: &[],
        });
        assert!(!html.contains("Recently"));
    }

    #[rstest]
    fn test_history_page_lists_records_in_given_order() {
        let timestamp =
            Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap());
        let records = vec![
            HistoryRecord::new(2, "buy milk", HistoryAction::Deleted, timestamp),
            HistoryRecord::new(1, "buy milk", HistoryAction::Added, timestamp),
        ];

        let html = history_page(&records);

        let deleted = html.find("DELETED").unwrap();
        let added = html.find(">ADDED<").unwrap();
        assert!(deleted < added);
        assert!(html.contains("2024-01-02 03:04:05"));
    }

    #[rstest]
    fn test_login_page_shows_flashes() {
        let html = login_page(&["Unauthorized user. Access denied.".to_string()]);
        assert!(html.contains("<p class=\"flash\">Unauthorized user. Access denied.</p>"));
        assert!(html.contains("name=\"username\""));
    }
}
