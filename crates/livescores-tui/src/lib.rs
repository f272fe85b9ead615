// Library root: re-exports the terminal frontend modules so integration tests
// and the binary share one public API.

pub mod app;
pub mod protocol;
pub mod settings_cli;
pub mod tui;
