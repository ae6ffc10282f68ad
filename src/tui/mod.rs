pub mod compare;
pub mod details;
pub mod footer;
pub mod header;
pub mod help;
pub mod log_view;
pub mod pickers;
pub mod render;
pub mod runs;
pub mod spinner;
