//! Status lines with a plain fallback for pipes and CI

use super::context::UiContext;
use console::style;

#[derive(Debug, Clone, Copy)]
enum Level {
    Ok,
    Info,
    Warn,
}

fn step(ctx: &UiContext, level: Level, message: &str) {
    if ctx.is_interactive() {
        let _ = match level {
            Level::Ok => cliclack::log::success(message),
            Level::Info => cliclack::log::info(message),
            Level::Warn => cliclack::log::warning(message),
        };
        return;
    }

    println!("{}", plain_line(level, message));
}

fn plain_line(level: Level, message: &str) -> String {
    let tag = match level {
        Level::Ok => style("[OK]").green(),
        Level::Info => style("[INFO]").cyan(),
        Level::Warn => style("[WARN]").yellow(),
    };
    format!("  {} {}", tag, message)
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Level::Ok, message);
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(
        ctx,
        Level::Ok,
        &format!("{} ({})", message, style(detail).dim()),
    );
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Level::Info, message);
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(
        ctx,
        Level::Warn,
        &format!("{} - {}", message, style(hint).dim()),
    );
}
