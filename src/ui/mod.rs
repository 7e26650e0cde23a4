//! Terminal output for the CLI
//!
//! Uses `cliclack` for prompts and step logging in interactive terminals and
//! falls back to plain, greppable lines in CI or when output is piped.
//!
//! ```rust,ignore
//! use precache::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "precache upgrade");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Staging shell resources...");
//! spinner.stop("Staged 4 shell resource(s)");
//!
//! ui::outro_success(&ctx, "Cache up to date");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, key_value_styled, outro_success, outro_warn, remark,
    section, step_error_detail, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{PrefetchProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{activation_detail, activation_style, coverage_style, init_theme, PrecacheTheme};
