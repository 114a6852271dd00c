//! Chat command handler: the interactive REPL.

use clap::Args;
use lexchat_chat::{build_router, ChatSession, TypingDisplay};
use lexchat_core::{config::AppConfig, AppResult};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMAND: &str = "exit";
const RESET_COMMAND: &str = "/reset";

/// Interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print answers at once instead of with a typing effect
    #[arg(long)]
    pub no_typing: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session");

        let router = Arc::new(build_router(config)?);
        let mut session = ChatSession::new(router);

        let mut display = TypingDisplay::from_config(&config.display);
        if self.no_typing {
            display.enabled = false;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = std::io::stdout();

        writeln!(
            stdout,
            "Ask a question. Type '{}' to quit or '{}' to start over.",
            EXIT_COMMAND, RESET_COMMAND
        )?;

        loop {
            write!(stdout, "You: ")?;
            stdout.flush()?;

            let Some(line) = lines.next_line().await? else {
                // EOF
                writeln!(stdout)?;
                break;
            };

            let input = line.trim();
            if input.eq_ignore_ascii_case(EXIT_COMMAND) {
                writeln!(stdout, "Bot: Goodbye! Have a nice day!")?;
                break;
            }
            if input == RESET_COMMAND {
                session.reset();
                writeln!(stdout, "Bot: Conversation cleared.")?;
                continue;
            }
            if input.is_empty() {
                continue;
            }

            match session.ask(input).await {
                Ok(result) => {
                    write!(stdout, "Bot: ")?;
                    display.render(&mut stdout, &result.text).await?;
                }
                Err(e) => {
                    writeln!(stdout, "Bot: An error occurred: {}", e)?;
                }
            }
        }

        tracing::info!(
            "Chat session ended after {} messages",
            session.transcript().len()
        );

        Ok(())
    }
}
