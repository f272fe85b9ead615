// Library root: the standings pipeline (fetch, cache, project) plus the
// settings, configuration and presentation pieces shared by every frontend.

pub mod cache;
pub mod client;
pub mod config;
pub mod html;
pub mod model;
pub mod projection;
pub mod refresh;
pub mod scheduler;
pub mod settings;
pub mod status;
pub mod store;
pub mod transport;
