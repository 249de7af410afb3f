//! Session view rendering
//!
//! Projects a session into the JSON view the browser draws. Every assistant
//! message goes through the sanitization pipeline on every render; user
//! messages are escaped and shown as typed.

use crate::sanitize::{sanitize, SanitizeConfig};
use crate::state_machine::Session;
use crate::transcript::{Message, Role, GREETING_PREFIX};
use serde::Serialize;

pub const COMMUNITY_URL: &str = "https://chat.whatsapp.com/H92LuwrK5ujH8ujiskzUvp";

const FOOTER_TEXT: &str = "Thank you! Let me know if you have any other queries regarding CUET (UG) or if I made a mistake.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub html: String,
    pub streaming: bool,
}

/// Everything the page needs for one paint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub messages: Vec<MessageView>,
    pub typing: bool,
    pub options: Vec<&'static str>,
    pub elapsed_time: String,
    pub chat_ended: bool,
    pub input_enabled: bool,
    pub footer_note: Option<String>,
}

impl SessionView {
    pub fn render(session_id: &str, session: &Session, config: &SanitizeConfig) -> Self {
        Self {
            session_id: session_id.to_string(),
            messages: session
                .transcript
                .messages()
                .iter()
                .map(|m| render_message(m, config))
                .collect(),
            typing: session.typing(),
            options: session
                .available_options()
                .into_iter()
                .map(|o| o.label())
                .collect(),
            elapsed_time: session.state.elapsed_time.clone(),
            chat_ended: session.state.chat_ended,
            input_enabled: session.input_enabled(),
            footer_note: show_footer(session).then(footer_note),
        }
    }
}

fn render_message(message: &Message, config: &SanitizeConfig) -> MessageView {
    let html = match message.role {
        Role::User => escape_html(message.content()),
        Role::Assistant if message.greeting => {
            sanitize(&format!("{GREETING_PREFIX}{}", message.content()), config)
        }
        Role::Assistant => sanitize(message.content(), config),
    };
    MessageView {
        id: message.id.to_string(),
        role: message.role,
        html,
        streaming: message.streaming,
    }
}

fn show_footer(session: &Session) -> bool {
    session.transcript.has_user_message() && !session.loading
}

fn footer_note() -> String {
    format!(
        "{FOOTER_TEXT} Join our community: <a href=\"{COMMUNITY_URL}\" target=\"_blank\" class=\"text-blue-600 underline hover:text-blue-800\">WhatsApp</a>"
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
