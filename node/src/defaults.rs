//! Defaults for optional config fields.

pub const DEFAULT_SERVER_URL: &str = "wss://x.kurnik.pl:17003/ws/";
pub const DEFAULT_LOGIN_URL: &str = "https://www.kurnik.pl/login.phtml";
pub const DEFAULT_LOBBY_URL: &str = "https://www.kurnik.pl/szachy/";
pub const DEFAULT_ORIGIN: &str = "http://kurnik.pl/";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAILBOX_SIZE: usize = 1024;
