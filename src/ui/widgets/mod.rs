//! UI Widgets

pub mod container_table;
pub mod footer;
pub mod header;
pub mod report_panel;
pub mod status_line;

pub use container_table::ContainerTable;
pub use footer::Footer;
pub use header::Header;
pub use report_panel::ReportPanel;
pub use status_line::StatusLine;
