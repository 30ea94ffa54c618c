//! Google Sheets and Drive clients.

pub mod client;
pub mod drive;
pub mod sheets;

pub use client::GoogleClient;
pub use drive::DriveClient;
pub use sheets::SheetsClient;
