//! Ask command handler: one question, one answer.

use clap::Args;
use lexchat_chat::{build_router, TypingDisplay};
use lexchat_core::{config::AppConfig, AppResult};
use std::io::Write;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let router = build_router(config)?;
        let result = router.route(&self.question, &[]).await?;

        tracing::debug!("Answered via {} path", result.path.as_str());

        let mut stdout = std::io::stdout().lock();

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "answer": result.text,
                "path": result.path,
                "provider": config.provider,
                "model": config.model,
            });
            let json = serde_json::to_string_pretty(&output)?;
            writeln!(stdout, "{}", json)?;
        } else {
            // Single-shot output is meant for pipes; no typing effect
            let display = TypingDisplay {
                enabled: false,
                ..TypingDisplay::from_config(&config.display)
            };
            display.render(&mut stdout, &result.text).await?;
        }

        Ok(())
    }
}
