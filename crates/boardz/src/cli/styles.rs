//! Styles for the boardz CLI.
//!
//! Renderers use semantic names (`index`, `done`, `info`) rather than colors,
//! so the look can change in one place. `console` drops the escape codes
//! when stdout is not a terminal, which keeps piped output and tests plain.

use console::Style;
use once_cell::sync::Lazy;

pub struct Styles {
    pub regular: Style,
    pub muted: Style,
    pub faint: Style,
    pub title: Style,
    pub index: Style,
    pub done: Style,
    pub info: Style,
    pub selected: Style,
    pub deadline: Style,
    pub overdue: Style,
    pub success: Style,
    pub warning: Style,
}

impl Styles {
    fn new() -> Self {
        let muted = Style::new().color256(245);
        Self {
            regular: Style::new(),
            faint: Style::new().color256(240),
            title: Style::new().bold(),
            index: Style::new().color256(178),
            done: muted.clone().strikethrough(),
            info: muted.clone().italic(),
            selected: Style::new().color256(178).bold(),
            deadline: Style::new().cyan(),
            overdue: Style::new().red().bold(),
            success: Style::new().green(),
            warning: Style::new().yellow().bold(),
            muted,
        }
    }
}

pub static STYLES: Lazy<Styles> = Lazy::new(Styles::new);
