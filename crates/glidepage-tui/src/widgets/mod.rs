mod header;
mod sections;
mod status_bar;

pub use header::HeaderWidget;
pub use sections::PageWidget;
pub use status_bar::StatusBarWidget;
