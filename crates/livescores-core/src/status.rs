// Status line vocabulary shared by every presenter.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Initializing,
    /// Initial load in progress.
    LoadingStandings,
    /// A scheduled refresh is in flight.
    FetchingData,
    Ready,
    NotConfigured,
    Error,
}

impl Status {
    pub fn is_error(self) -> bool {
        matches!(self, Status::Error | Status::NotConfigured)
    }

    /// A fetch is (or was last reported as) in flight.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Status::LoadingStandings | Status::FetchingData)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Initializing => "Initializing...",
            Status::LoadingStandings => "Loading standings...",
            Status::FetchingData => "Fetching data...",
            Status::Ready => "Ready",
            Status::NotConfigured => "Not configured",
            Status::Error => "Error",
        };
        f.write_str(text)
    }
}
