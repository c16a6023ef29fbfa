// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML builders shaped like the CRM's pages.
//!
//! Only the structure the scraper keys on is reproduced: the message
//! container and its blocks, the profile panel, the tag table, the friend
//! list with its pager, the detail table, and the login form.

use std::fmt::Write;

enum Entry {
    Date(String),
    Message {
        side: &'static str,
        text: String,
        time: String,
        staff: Option<String>,
    },
    Raw(String),
}

/// Builder for a user's chat page.
#[derive(Default)]
pub struct ChatPage {
    agent: Option<String>,
    profile: Vec<(String, String)>,
    tags: Vec<String>,
    entries: Vec<Entry>,
    chat_button: bool,
}

impl ChatPage {
    pub fn new() -> Self {
        Self {
            chat_button: true,
            ..Self::default()
        }
    }

    /// Page-level assigned agent, rendered ahead of the transcript.
    pub fn agent(mut self, name: &str) -> Self {
        self.agent = Some(name.to_string());
        self
    }

    /// One label/value row in the profile panel.
    pub fn profile(mut self, label: &str, value: &str) -> Self {
        self.profile.push((label.to_string(), value.to_string()));
        self
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.tags.push(name.to_string());
        self
    }

    /// Omit the "open chat" button.
    pub fn without_chat_button(mut self) -> Self {
        self.chat_button = false;
        self
    }

    /// A date separator, e.g. `2025年04月02日(水)`. It shares a block with
    /// the next message, as the CRM renders it.
    pub fn date(mut self, header: &str) -> Self {
        self.entries.push(Entry::Date(header.to_string()));
        self
    }

    pub fn customer(mut self, text: &str, time: &str) -> Self {
        self.entries.push(Entry::Message {
            side: "you",
            text: text.to_string(),
            time: time.to_string(),
            staff: None,
        });
        self
    }

    /// A support message; `staff` fills the per-message sender label.
    pub fn support(mut self, text: &str, time: &str, staff: Option<&str>) -> Self {
        self.entries.push(Entry::Message {
            side: "me",
            text: text.to_string(),
            time: time.to_string(),
            staff: staff.map(str::to_string),
        });
        self
    }

    /// A verbatim block inside the message container.
    pub fn raw_block(mut self, html: &str) -> Self {
        self.entries.push(Entry::Raw(html.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut html = String::from("<html><body>");
        if let Some(agent) = &self.agent {
            let _ = write!(
                html,
                "<div class=\"assignee\">担当者: <span class=\"underline cursor-pointer\">{agent}</span></div>"
            );
        }
        if self.chat_button {
            html.push_str("<a class=\"btn btn-sns-line-my-page\" href=\"#chat\">チャット</a>");
        }
        if !self.profile.is_empty() {
            html.push_str("<div id=\"friend-info\">");
            for (label, value) in &self.profile {
                let _ = write!(
                    html,
                    "<div class=\"mt-[20px]\"><p>{label}</p><span>{value}</span></div>"
                );
            }
            html.push_str("</div>");
        }
        if !self.tags.is_empty() {
            html.push_str(&tag_panel(&self.tags.iter().map(String::as_str).collect::<Vec<_>>()));
        }

        html.push_str("<div id=\"messages-container-v2\">");
        let mut pending_date: Option<String> = None;
        for entry in self.entries {
            match entry {
                Entry::Date(header) => {
                    if let Some(previous) = pending_date.replace(header) {
                        let _ = write!(html, "<div><div class=\"time-center\">{previous}</div></div>");
                    }
                }
                Entry::Message {
                    side,
                    text,
                    time,
                    staff,
                } => {
                    html.push_str("<div>");
                    if let Some(header) = pending_date.take() {
                        let _ = write!(html, "<div class=\"time-center\">{header}</div>");
                    }
                    let body = text.replace('\n', "<br>");
                    let _ = write!(
                        html,
                        "<div class=\"{side}\"><div class=\"message\">{body}</div><div class=\"time-send\">{time}</div>"
                    );
                    if let Some(staff) = staff {
                        let _ = write!(
                            html,
                            "<div class=\"tooltip-container staff_name_show\"><div>送信者: <span class=\"underline cursor-pointer\">{staff}</span></div></div>"
                        );
                    }
                    html.push_str("</div></div>");
                }
                Entry::Raw(block) => html.push_str(&block),
            }
        }
        if let Some(header) = pending_date {
            let _ = write!(html, "<div><div class=\"time-center\">{header}</div></div>");
        }
        html.push_str("</div></body></html>");
        html
    }
}

/// The tag tab plus the tag table, one checkbox row per tag.
pub fn tag_panel(tags: &[&str]) -> String {
    let mut html = String::from(
        "<ul class=\"tabs\"><li data-name=\"tag\">タグ</li></ul><div id=\"tab-tag\"><table id=\"table_choose_tag\"><tbody>",
    );
    for tag in tags {
        let _ = write!(
            html,
            "<tr><td><input type=\"checkbox\"></td><td>{tag}</td></tr>"
        );
    }
    html.push_str("</tbody></table></div>");
    html
}

/// One friend-list page. `rows` are (display name, detail href) pairs.
pub fn roster_page(rows: &[(&str, &str)], has_next: bool) -> String {
    let mut html = String::from("<html><body><table class=\"friend-list\"><tr><th>名前</th></tr>");
    for (name, href) in rows {
        let _ = write!(
            html,
            "<tr><td><a href=\"{href}\">{name}</a></td><td>LINE</td></tr>"
        );
    }
    html.push_str("</table><ul class=\"pagination\">");
    let class = if has_next { "" } else { "disabled" };
    let _ = write!(
        html,
        "<li class=\"{class}\"><a href=\"#\"><span class=\"glyphicon glyphicon-menu-right\"></span></a></li>"
    );
    html.push_str("</ul></body></html>");
    html
}

/// A friend detail page carrying the "friend added" datetime as displayed.
pub fn detail_page(registered: &str) -> String {
    format!(
        "<html><body><table class=\"tbl_info_df\"><tr><td>LINE名</td><td>x</td></tr>\
         <tr><td>友だち追加日時</td><td>{registered}</td></tr></table></body></html>"
    )
}

/// The login page with both credential inputs.
pub fn login_page() -> String {
    "<html><body><form><input id=\"email_login\" type=\"email\">\
     <input id=\"password_login\" type=\"password\"></form></body></html>"
        .to_string()
}
