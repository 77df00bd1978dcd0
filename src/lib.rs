pub mod api;
pub mod content;
pub mod features;
pub mod ssl;
pub mod url_parser;
pub mod utils;
