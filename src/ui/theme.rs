//! Colors for prompts and cache state

use crate::lifecycle::ActivationMode;
use cliclack::ThemeState;
use console::Style;

/// Blue while a phase runs; bars turn green once it settles
#[derive(Debug, Clone, Default)]
pub struct PrecacheTheme;

impl cliclack::Theme for PrecacheTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

pub fn init_theme() {
    cliclack::set_theme(PrecacheTheme);
}

/// How an activation branch is described to the user
pub fn activation_detail(mode: ActivationMode) -> &'static str {
    match mode {
        ActivationMode::Cold => "cold start",
        ActivationMode::Warm => "diffed against previous release",
    }
}

/// A cold start rebuilt the cache from scratch and is worth noticing
pub fn activation_style(mode: ActivationMode) -> Style {
    match mode {
        ActivationMode::Cold => Style::new().yellow(),
        ActivationMode::Warm => Style::new().green(),
    }
}

/// Full coverage green, partial yellow, empty dim
pub fn coverage_style(present: usize, total: usize) -> Style {
    if total > 0 && present == total {
        Style::new().green()
    } else if present > 0 {
        Style::new().yellow()
    } else {
        Style::new().dim()
    }
}
