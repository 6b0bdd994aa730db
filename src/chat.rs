//! Interactive chat mode
//!
//! Readline loop that submits user input through the exchange controller and
//! renders whatever each exchange appended to the session. Local commands
//! (`/sql`, `/status`, `/help`, `/quit`) are handled without touching the
//! controller.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::client::RelayClient;
use crate::config::Config;
use crate::core::{ExchangeController, Outcome};
use crate::render;

enum Command {
    ToggleSql,
    Status,
    Help,
    Exit,
    None,
}

fn parse_command(input: &str) -> Command {
    match input {
        "/sql" => Command::ToggleSql,
        "/status" => Command::Status,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Exit,
        _ => Command::None,
    }
}

/// Run the terminal client against the configured relay.
pub async fn run_chat(config: Config) -> Result<()> {
    tracing::info!(relay_url = config.relay_url, "starting chat session");

    let relay = RelayClient::new(config.relay_url.clone());
    let mut controller = ExchangeController::new(relay);
    let mut show_sql = false;

    let mut rl = DefaultEditor::new()?;

    print_banner(&controller);

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Command::ToggleSql => {
                        show_sql = !show_sql;
                        let state = if show_sql { "shown" } else { "hidden" };
                        println!("Generated SQL is now {state}.\n");
                        continue;
                    }
                    Command::Status => {
                        print_status(&controller, show_sql);
                        continue;
                    }
                    Command::Help => {
                        print_help();
                        continue;
                    }
                    Command::Exit => break,
                    Command::None => {}
                }

                rl.add_history_entry(trimmed)?;

                let before = controller.session().messages().len();
                println!("{}", render::thinking_line());

                match controller.submit(trimmed).await {
                    Outcome::Replied => {
                        // Skip index `before`: that is the user's own echo.
                        for message in &controller.session().messages()[before + 1..] {
                            println!("{}\n", render::render_message(message, show_sql));
                        }
                    }
                    Outcome::Failed => {
                        if let Some(reason) = controller.session().error() {
                            println!("{}\n", render::error_line(reason));
                        }
                    }
                    Outcome::Skipped => {}
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("Bye!");
    Ok(())
}

fn print_banner(controller: &ExchangeController<RelayClient>) {
    if let Some(welcome) = controller.session().messages().first() {
        println!("\n{}\n", render::render_message(welcome, false));
    }
    println!("Type {} for commands.\n", "/help".cyan());
}

fn print_status(controller: &ExchangeController<RelayClient>, show_sql: bool) {
    let session = controller.session();
    let conversation = session.conversation_id().unwrap_or("(not started)");
    println!(
        "Conversation: {}\nMessages: {}\nGenerated SQL: {}\n",
        conversation,
        session.messages().len(),
        if show_sql { "shown" } else { "hidden" },
    );
}

fn print_help() {
    println!(
        "Commands:\n  {}     toggle generated SQL visibility\n  {}  show session status\n  {}    show this help\n  {}    leave the chat\n",
        "/sql".cyan(),
        "/status".cyan(),
        "/help".cyan(),
        "/quit".cyan(),
    );
}
