use std::error::Error;
use std::io::Write;

use colored::*;
use reqwest::Client;
use rustyline::DefaultEditor;

use super::display::{display_health, display_reply};
use crate::rag::BotReply;
use crate::server::types::{ApiResponse, AskRequest, HealthResponse};

const CYAN: &str = "\x1b[36m";
const BRIGHT_CYAN: &str = "\x1b[96m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

fn print_help() {
    println!("\n{CYAN}Coffee Corner Chat Commands{RESET}");
    println!("{BRIGHT_CYAN}{}{RESET}", "=".repeat(60));
    println!("{GREEN}exit, bye, quit{RESET} - Exit the chat");
    println!("{GREEN}help{RESET}            - Show this help message");
    println!("{GREEN}clear{RESET}           - Clear the screen");
    println!("{GREEN}health{RESET}          - Show server health");
    println!("Anything else is sent to the bot as a customer message.");
    println!();
}

/// Sends one message to a running server's ask endpoint.
pub async fn ask_server(client: &Client, server_url: &str, message: &str) -> Result<BotReply, Box<dyn Error + Send + Sync>> {
    let response: ApiResponse<BotReply> = client
        .post(format!("{}/api/v1/ask", server_url))
        .json(&AskRequest { message: message.to_string() })
        .send()
        .await?
        .json()
        .await?;

    match response.data {
        Some(reply) if response.status == "success" => Ok(reply),
        _ => Err(response
            .message
            .unwrap_or_else(|| "server returned no reply".to_string())
            .into()),
    }
}

async fn handle_health(client: &Client, server_url: &str) {
    match client.get(format!("{}/health", server_url)).send().await {
        Ok(response) => match response.json::<HealthResponse>().await {
            Ok(health) => display_health(&health),
            Err(e) => println!("Error reading health response: {}", e),
        },
        Err(e) => println!("Error requesting health: {}", e),
    }
}

// --- Main Chat Loop ---

/// Interactive session against the server at `server_url`.
pub async fn chat_loop(server_url: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting chat session with {}", server_url);
    print_help();

    let mut rl = DefaultEditor::new()?;
    let client = Client::new();
    let server_url = server_url.trim_end_matches('/');

    loop {
        match rl.readline("[you] > ") {
            Ok(input) => {
                let input_trimmed = input.trim();
                if input_trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input_trimmed);

                match input_trimmed.to_lowercase().as_str() {
                    "exit" | "bye" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" => print_help(),
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        std::io::stdout().flush()?;
                    }
                    "health" => handle_health(&client, server_url).await,
                    _ => match ask_server(&client, server_url, input_trimmed).await {
                        Ok(reply) => display_reply(None, &reply),
                        Err(e) => println!("{}", format!("Error: {}", e).red()),
                    },
                }
            }
            Err(_) => {
                println!("Goodbye!");
                break;
            }
        }
    }
    Ok(())
}
