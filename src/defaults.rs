//! Central place for all default values.
//! Update these and the whole crate picks them up.

pub struct Defaults;

impl Defaults {
    /* Session signature */
    pub const APP_ID: &'static str = "5dde4e1bdf9e4966b387ba58f4b3fdc3";
    pub const DEVICE_NAME: &'static str = "Chrome浏览器";
    pub const MODEL_NAME: &'static str = "Mac OS网页版";
    pub const SIGNATURE_VALIDITY_SECS: u64 = 82_800; // 23h
    pub const SIGNATURE_FORMAT_BYTE: u8 = 0x00;
    /// Literal sequence counter bound into the session message.
    pub const SESSION_NONCE: u64 = 0;

    /* Access token */
    pub const TOKEN_SAFETY_MARGIN_SECS: u64 = 60;

    /// Upper bound for every configured window (validity, margin, interval): 366 days.
    pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 60 * 60;

    /* Keep-alive */
    pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 10;

    /* Logging */
    pub const LOG_FILTER: &'static str = "drive_credentials=info";
}
