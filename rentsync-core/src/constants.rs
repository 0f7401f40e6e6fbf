/// Days of premium access kept after `current_period_end` passes.
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// Days before expiry at which renewal reminders go out.
pub const EXPIRY_REMINDER_DAYS: [i64; 3] = [7, 3, 1];

/// Property limit applied when a subscription expires.
pub const FREE_PROPERTY_LIMIT: i32 = 1;

/// Calendar months visible on a shared calendar without a paid plan.
pub const FREE_CALENDAR_MONTHS: u32 = 2;

/// Sentinel used by plan limits and user overrides for "no limit".
pub const UNLIMITED: i32 = -1;

/// Rows per locked-date upsert request.
pub const UPSERT_BATCH_SIZE: usize = 500;

pub const REMINDER_CHANNEL: &str = "push";

pub const DEFAULT_USER_AGENT: &str = "RentSync-Calendar-Sync/1.0";

pub const DEFAULT_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Push tokens issued by the mobile push provider start with one of these.
pub const PUSH_TOKEN_PREFIXES: [&str; 2] = ["ExponentPushToken[", "ExpoPushToken["];

pub const ICS_PRODID: &str = "-//RentSync//Availability Feed//EN";

pub const UID_DOMAIN: &str = "rentsync";
