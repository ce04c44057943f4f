pub mod daily_time;
pub mod reminder;

pub use daily_time::{DailyTime, InvalidDailyTime};
pub use reminder::{reminder_text, ReminderScheduler};
