//! Message formatting utilities for client display.

use chrono::{DateTime, Local, Utc};
use irori_shared::protocol::{AI_USERNAME, ChatBroadcast, MemberInfo};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the successful join with the member list
    ///
    /// # Arguments
    ///
    /// * `room_id` - The joined room
    /// * `members` - Members in join order
    /// * `me` - The current client's username (to mark as "me")
    pub fn format_joined(room_id: &str, members: &[MemberInfo], me: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!("Joined room '{}'\n", room_id));
        output.push_str(&Self::member_lines(members, me));
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format an `updateMembers` notification
    pub fn format_members(members: &[MemberInfo], me: &str) -> String {
        format!("\nMembers ({}/4):\n{}", members.len(), Self::member_lines(members, me))
    }

    fn member_lines(members: &[MemberInfo], me: &str) -> String {
        if members.is_empty() {
            return "(No members)\n".to_string();
        }
        members
            .iter()
            .map(|member| {
                let me_suffix = if member.username == me { " (me)" } else { "" };
                format!("  {}{}\n", member.username, me_suffix)
            })
            .collect()
    }

    /// Format a chat message
    ///
    /// AI answers are shown with the member they reply to.
    ///
    /// # Arguments
    ///
    /// * `chat` - The received chat message
    /// * `received_at` - Unix timestamp when the message was received (milliseconds)
    pub fn format_chat_message(chat: &ChatBroadcast, received_at: i64) -> String {
        let header = match (&chat.reply_to, chat.username == AI_USERNAME) {
            (Some(reply_to), true) => format!("@{} -> @{}", chat.username, reply_to),
            _ => format!("@{}", chat.username),
        };
        format!(
            "\n\n{}\n{}: {}\nat {}\n{}\n",
            THIN_RULE,
            header,
            chat.message,
            clock_time(received_at),
            THIN_RULE
        )
    }

    /// Format an `aiQueueUpdate` notification
    pub fn format_queue(positions: &[usize]) -> String {
        match positions.len() {
            0 => "\n[AI queue] empty\n".to_string(),
            1 => "\n[AI queue] 1 request waiting\n".to_string(),
            n => format!("\n[AI queue] {} requests waiting\n", n),
        }
    }

    /// Format an `aiTyping` notification
    pub fn format_typing(typing: bool) -> String {
        if typing {
            "\n[AI is typing...]\n".to_string()
        } else {
            "\n[AI finished]\n".to_string()
        }
    }

    /// Format an `error` event from the server
    pub fn format_error(message: &str) -> String {
        format!("\n! {}\n", message)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

/// Local wall-clock time (`HH:MM:SS`) of a Unix millisecond timestamp
fn clock_time(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string()
}
