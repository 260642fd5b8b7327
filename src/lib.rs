pub mod config;
pub mod dwell;
pub mod messages;
pub mod slideshow;
pub mod tasks {
    pub mod driver;
    pub mod presenter;
    pub mod qr;
}
