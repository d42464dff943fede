//! Parsing composer lines.
//!
//! Plain lines are text messages. Attachments go through slash commands, the
//! terminal stand-in for the image picker, location and audio buttons.

use chatter_shared::{Coordinates, MessageBody, OutgoingMessage, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Attachment(MessageBody),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  /image <url>          send an image link
  /audio <url>          send an audio recording link
  /location <lat> <lon> send a location
  /help                 show this help
  /quit                 leave";

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(Input::Text(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let input = match (name, args.as_slice()) {
        ("quit" | "exit", []) => Input::Quit,
        ("help", []) => Input::Help,
        ("image", [url]) => Input::Attachment(MessageBody::Image {
            url: url.to_string(),
        }),
        ("audio", [url]) => Input::Attachment(MessageBody::Audio {
            url: url.to_string(),
        }),
        ("location", [lat, lon]) => Input::Attachment(MessageBody::Location {
            coords: parse_coordinates(lat, lon)?,
        }),
        _ => return Err(format!("Unknown command: /{command}. Try /help")),
    };
    Ok(Some(input))
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Coordinates, String> {
    let latitude: f64 = lat.parse().map_err(|_| format!("Bad latitude: {lat}"))?;
    let longitude: f64 = lon.parse().map_err(|_| format!("Bad longitude: {lon}"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err("Coordinates out of range".to_string());
    }
    Ok(Coordinates {
        latitude,
        longitude,
    })
}

impl Input {
    /// The message to send, if this input is one.
    pub fn into_outgoing(self, sender: Sender) -> Option<OutgoingMessage> {
        match self {
            Input::Text(text) => Some(OutgoingMessage::text(sender, text)),
            Input::Attachment(body) => Some(OutgoingMessage::attachment(sender, body)),
            Input::Help | Input::Quit => None,
        }
    }
}
