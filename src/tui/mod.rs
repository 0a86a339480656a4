//! Terminal dashboard
//!
//! Ratatui front end over the token provider. Network work runs on a
//! background task and reports back over a channel.

mod app;
mod backend;
mod help;
mod ui;

pub use app::run;
pub use backend::BackendContext;
