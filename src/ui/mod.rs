//! Terminal output for the administrative commands
//!
//! Uses `cliclack` when attached to a terminal and falls back to tagged
//! plain lines (`[OK]`, `[WARN]`, ...) in pipes and CI.
//!
//! ```rust,ignore
//! use genrepo::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//! if ui::confirm(&ctx, "Remove 3 cached results?", false).await? {
//!     ui::step_ok(&ctx, "Cleared 3 result(s)");
//! }
//! ```

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_ok_detail, step_warn_hint};
pub use prompts::confirm;
