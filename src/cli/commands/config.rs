//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::GenrepoResult;
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager) -> GenrepoResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(manager).await,
        Some(ConfigAction::Path) => {
            println!("{}", manager.path().display());
            Ok(())
        }
        Some(ConfigAction::Init { force }) => init_config(manager, force).await,
    }
}

async fn show_config(manager: &ConfigManager) -> GenrepoResult<()> {
    let config = manager.load().await?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GenrepoResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genrepo/config.toml");
        let manager = ConfigManager::with_path(path.clone());

        init_config(&manager, false).await.unwrap();
        assert!(path.exists());

        std::fs::write(&path, "[cache]\nretention_days = 1\n").unwrap();
        init_config(&manager, false).await.unwrap();
        assert_eq!(manager.load().await.unwrap().cache.retention_days, 1);

        init_config(&manager, true).await.unwrap();
        assert_eq!(manager.load().await.unwrap().cache.retention_days, 7);
    }
}
