// TUI widget modules for each dashboard panel.

pub mod help_bar;
pub mod standings;
pub mod status_bar;
