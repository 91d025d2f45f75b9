//! `siteprobe chat`: follow-up questions to one persona of a saved analysis.

use anyhow::{bail, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::display::{action_success, relative_time, short_id};
use crate::cli::id_resolver::resolve_analysis_id;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ChatMessage, ChatRole};
use crate::services::PersonaChat;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Analysis ID or unique prefix
    pub analysis_id: String,

    /// Persona to talk to
    pub persona_id: String,

    /// Question to ask; omit to print the transcript
    pub message: Option<String>,

    /// Delete the transcript instead
    #[arg(long, conflicts_with = "message")]
    pub clear: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatReplyOutput {
    pub analysis_id: Uuid,
    pub persona_id: String,
    pub reply: ChatMessage,
}

impl CommandOutput for ChatReplyOutput {
    fn to_human(&self) -> String {
        format!("{} {}", style(format!("{}:", self.persona_id)).cyan().bold(), self.reply.content)
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptOutput {
    pub analysis_id: Uuid,
    pub persona_id: String,
    pub messages: Vec<ChatMessage>,
}

impl CommandOutput for TranscriptOutput {
    fn to_human(&self) -> String {
        if self.messages.is_empty() {
            return format!(
                "No conversation with {} on analysis {} yet.",
                self.persona_id,
                short_id(&self.analysis_id.to_string())
            );
        }
        self.messages
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    ChatRole::User => style("you".to_string()).green().bold(),
                    ChatRole::Persona => style(self.persona_id.clone()).cyan().bold(),
                };
                format!(
                    "{} {}\n  {}",
                    speaker,
                    style(relative_time(&m.timestamp)).dim(),
                    m.content.replace('\n', "\n  ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ChatClearedOutput {
    success: bool,
    message: String,
}

impl CommandOutput for ChatClearedOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: ChatArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let repositories = &ctx.repositories;
    let analysis_id = resolve_analysis_id(repositories.history.as_ref(), &args.analysis_id).await?;

    if args.clear {
        if !repositories.chats.clear(analysis_id, &args.persona_id).await? {
            bail!("No conversation with {} on analysis {analysis_id}", args.persona_id);
        }
        let out = ChatClearedOutput {
            success: true,
            message: format!("Cleared conversation with {}", args.persona_id),
        };
        output(&out, json_mode);
        return Ok(());
    }

    match args.message {
        Some(message) => {
            let chat = PersonaChat::new(ctx.oracle()?, repositories.clone());
            let reply = chat.send(analysis_id, &args.persona_id, &message).await?;
            let out = ChatReplyOutput {
                analysis_id,
                persona_id: args.persona_id,
                reply,
            };
            output(&out, json_mode);
        }
        None => {
            let messages = repositories.chats.messages(analysis_id, &args.persona_id).await?;
            let out = TranscriptOutput {
                analysis_id,
                persona_id: args.persona_id,
                messages,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
