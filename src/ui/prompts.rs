//! Confirmation prompt with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{GenrepoError, GenrepoResult};

/// Ask a yes/no question.
///
/// Auto-yes answers true; a non-interactive context answers `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> GenrepoResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| GenrepoError::Internal(format!("Prompt task failed: {}", e)))?
    .map_err(|e| GenrepoError::User(format!("Prompt failed: {}", e)))
}
