//! User-facing message texts.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

pub const UNSUPPORTED_ATTACHMENT: &str = "⚠️ Please send a **photo or an image file**.";
pub const COULD_NOT_LOAD_IMAGE: &str = "⚠️ Error: Could not load image.";
pub const RECOGNITION_FAILED: &str =
    "⚠️ Error: Could not read text from the image right now. Please try again later.";
pub const NO_TEXT_FOUND: &str = "⚠️ No readable text found. Try sending a clearer image.";
pub const SEND_ANOTHER_IMAGE: &str = "🔄 Please send another image.";
pub const ADVICE_ERROR: &str = "❌ Error retrieving medication details.";

/// Label used when a confirm arrives with nothing pending.
pub const UNKNOWN_MEDICATION: &str = "Unknown";

pub fn greeting<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "👋 Hello! I'm your medication assistant bot. The time now is {}.\n\n\
         Please take a vertical, clear, well-lit picture of your medication. \n\n\
         I will remind you to take it at the appropriate time.",
        now.format("%d-%m-%Y, %H:%M:%S")
    )
}

pub fn extracted_text(text: &str) -> String {
    format!("📄 **Extracted Medication Name(s):**\n```{text}```\n\nDoes this look correct?")
}

pub fn confirmed(text: &str) -> String {
    format!("✅ Confirmed! Please wait a few moments...\n```\n{text}```")
}

pub fn reminder_set(daily_time: impl Display) -> String {
    format!("✅ **Reminder set for {daily_time}**.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn greeting_shows_local_time() {
        let now = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 14, 9, 5, 7)
            .unwrap();
        let text = greeting(&now);
        assert!(text.contains("The time now is 14-03-2025, 09:05:07."));
        assert!(text.contains("well-lit picture"));
    }

    #[test]
    fn extracted_text_wraps_in_code_block() {
        assert_eq!(
            extracted_text("Paracetamol 500mg"),
            "📄 **Extracted Medication Name(s):**\n```Paracetamol 500mg```\n\nDoes this look correct?"
        );
    }

    #[test]
    fn reminder_set_names_time() {
        assert_eq!(reminder_set("17:52"), "✅ **Reminder set for 17:52**.");
    }
}
