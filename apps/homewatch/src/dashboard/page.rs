use std::fmt::Write as _;

use super::summary::{StatusSummary, TailRow, TAIL_COLUMNS};
use super::window::{TimeWindow, WindowRequest, MAX_HOURS_BACK, MIN_HOURS_BACK};

/// A chart slot on the page: either the rendered SVG or why it is missing.
#[derive(Debug, Clone)]
pub enum Section {
    Chart { title: String, svg: String },
    Warning { title: String, message: String },
}

#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub request: &'a WindowRequest,
    pub window: &'a TimeWindow,
    pub status: &'a StatusSummary,
    pub tail: &'a [TailRow],
    pub sections: &'a [Section],
    /// Shown above the charts, e.g. when the climate log itself is unreadable.
    pub notices: &'a [String],
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif;margin:1.5rem;color:#222}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:2px 8px;text-align:right}\
.warning{background:#fff3cd;border:1px solid #e0c36c;padding:6px 10px}\
form label{margin-right:1rem}";

impl Page<'_> {
    pub fn render(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Home monitoring</title>\n");
        let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
        html.push_str("<h1>Home monitoring</h1>\n");
        self.write_form(&mut html);
        let _ = writeln!(
            html,
            "<p>Period: {}</p>",
            escape_html(&self.window.label())
        );

        for notice in self.notices {
            let _ = writeln!(html, "<p class=\"warning\">{}</p>", escape_html(notice));
        }

        html.push_str("<h2>Status</h2>\n<ul>\n");
        for line in self.status.lines() {
            let _ = writeln!(html, "<li>{}</li>", escape_html(&line));
        }
        html.push_str("</ul>\n");

        for section in self.sections {
            match section {
                Section::Chart { title, svg } => {
                    let _ = writeln!(html, "<h2>{}</h2>\n<div>{svg}</div>", escape_html(title));
                }
                Section::Warning { title, message } => {
                    let _ = writeln!(
                        html,
                        "<h2>{}</h2>\n<p class=\"warning\">{}</p>",
                        escape_html(title),
                        escape_html(message)
                    );
                }
            }
        }

        self.write_tail(&mut html);
        html.push_str("</body>\n</html>\n");
        html
    }

    fn write_form(&self, html: &mut String) {
        let _ = writeln!(
            html,
            "<form method=\"get\" action=\"/\">\
             <label>Hours back <input type=\"number\" name=\"hours_back\" min=\"{MIN_HOURS_BACK}\" max=\"{MAX_HOURS_BACK}\" value=\"{}\"></label>\
             <label>End date <input type=\"date\" name=\"end_date\" value=\"{}\"></label>\
             <label>End hour <input type=\"number\" name=\"end_hour\" min=\"0\" max=\"23\" value=\"{}\"></label>\
             <button type=\"submit\">Show</button></form>",
            self.request.hours_back.clamp(MIN_HOURS_BACK, MAX_HOURS_BACK),
            self.request.end_date.format("%Y-%m-%d"),
            self.request.end_hour,
        );
    }

    fn write_tail(&self, html: &mut String) {
        html.push_str("<h2>Latest samples</h2>\n<table>\n<tr>");
        for column in TAIL_COLUMNS {
            let _ = write!(html, "<th>{}</th>", escape_html(column));
        }
        html.push_str("</tr>\n");
        for row in self.tail {
            html.push_str("<tr>");
            for cell in row.cells() {
                let _ = write!(html, "<td>{}</td>", escape_html(cell));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</table>\n");
    }
}
