//! Chat history listing command.

use crate::cli::truncate_content;
use crate::store::Store;

const PREVIEW_CHARS: usize = 120;

/// List recent chats, or only the 5-star few-shot examples.
pub async fn run_chats_command(
    store: &Store,
    limit: i64,
    high_quality: bool,
    json: bool,
) -> anyhow::Result<()> {
    if high_quality {
        let examples = store.get_high_quality_chats().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&examples)?);
            return Ok(());
        }
        if examples.is_empty() {
            println!("No 5-star chats yet.");
            return Ok(());
        }
        for (i, example) in examples.iter().enumerate() {
            println!("{}. Q: {}", i + 1, truncate_content(&example.user_query, PREVIEW_CHARS));
            println!("   A: {}", truncate_content(&example.ai_response, PREVIEW_CHARS));
            println!();
        }
        return Ok(());
    }

    let chats = store.get_recent_chats(limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }
    if chats.is_empty() {
        println!("No chats recorded.");
        return Ok(());
    }

    for chat in &chats {
        let rating = chat
            .rating
            .map(|r| format!("{}/5", r))
            .unwrap_or_else(|| "unrated".to_string());
        println!("#{} [{}] {}", chat.id, chat.timestamp.format("%Y-%m-%d %H:%M:%S"), rating);
        println!(
            "   Q: {}",
            truncate_content(chat.user_query.as_deref().unwrap_or(""), PREVIEW_CHARS)
        );
        println!(
            "   A: {}",
            truncate_content(chat.ai_response.as_deref().unwrap_or(""), PREVIEW_CHARS)
        );
        println!();
    }
    Ok(())
}
