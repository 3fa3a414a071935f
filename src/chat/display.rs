use colored::*;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use crate::rag::BotReply;
use crate::server::types::HealthResponse;

/// Prints a bot reply with its quick replies and sources.
///
/// # Arguments
///
/// * `question` - The message the reply answers, echoed when given
/// * `reply` - The bot's answer
pub fn display_reply(question: Option<&str>, reply: &BotReply) {
    if let Some(question) = question {
        println!("\n👤 {}", question.bright_white());
    }
    println!("🤖 {}", reply.reply.green());

    if reply.quick_replies.is_empty() && reply.sources.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Quick replies").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Sources").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let rows = reply.quick_replies.len().max(reply.sources.len());
    for i in 0..rows {
        table.add_row(vec![
            Cell::new(reply.quick_replies.get(i).map(String::as_str).unwrap_or(""))
                .fg(comfy_table::Color::Yellow),
            Cell::new(reply.sources.get(i).map(String::as_str).unwrap_or(""))
                .fg(comfy_table::Color::DarkGrey),
        ]);
    }

    println!("{}", table);
    println!("📚 Sources: {:?}", reply.sources);
}

/// Prints the server health summary.
pub fn display_health(health: &HealthResponse) {
    println!(
        "{} {} (up {}s)",
        health.status.bright_green(),
        health.message,
        health.uptime_seconds
    );
}
