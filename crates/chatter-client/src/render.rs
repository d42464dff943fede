//! Plain-text rendering of the message list and connectivity notices.

use chrono::Local;

use chatter_shared::{ConnectivityState, Message, MessageBody, MessageList};

/// One line per message.
pub fn format_message(message: &Message, local_user: &str) -> String {
    let time = message.sent_at.with_timezone(&Local).format("%H:%M");
    let who = if message.sender.id == local_user {
        "you"
    } else {
        message.sender.display_name.as_str()
    };

    match &message.body {
        MessageBody::Text { text } => format!("[{time}] {who}: {text}"),
        MessageBody::Image { url } => format!("[{time}] {who}: [image] {url}"),
        MessageBody::Audio { url } => format!("[{time}] {who}: [audio] {url}"),
        MessageBody::Location { coords } => format!(
            "[{time}] {who}: [location] {:.5}, {:.5}",
            coords.latitude, coords.longitude
        ),
        MessageBody::System { text } => format!("[{time}] * {text}"),
    }
}

/// The newest `limit` messages, oldest first so the latest ends up at the
/// bottom of the terminal.
pub fn render_list(list: &MessageList, local_user: &str, limit: usize) -> Vec<String> {
    list.iter()
        .take(limit)
        .rev()
        .map(|m| format_message(m, local_user))
        .collect()
}

/// Banner for a connectivity change, if it deserves one.
pub fn state_notice(previous: ConnectivityState, next: ConnectivityState) -> Option<&'static str> {
    use ConnectivityState::*;

    match (previous, next) {
        (Online, Offline) => Some("Connection lost. Showing cached messages; sending is disabled."),
        (Unknown, Offline) => Some("Offline. Showing cached messages; sending is disabled."),
        (Offline, Online) => Some("Back online."),
        _ => None,
    }
}
