//! Time-of-day greeting shown when a session starts

use chrono::{Local, Timelike};
use rand::seq::IndexedRandom;

const MORNING_GREETINGS: &[&str] = &[
    "صباح الخير! 🌞 كيف يمكنني مساعدتك اليوم؟",
    "أهلاً بك في هذا الصباح الجميل!",
];
const AFTERNOON_GREETING: &str = "مساء النور! 🌇 كيف حالك؟";
const EVENING_GREETING: &str = "مساء الخير! 🌙 كيف يمكنني مساعدتك؟";

/// Greeting for the current local hour
pub fn greeting() -> &'static str {
    greeting_for_hour(Local::now().hour())
}

/// Morning is 05-11, afternoon 12-17, evening otherwise
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => MORNING_GREETINGS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(MORNING_GREETINGS[0]),
        12..=17 => AFTERNOON_GREETING,
        _ => EVENING_GREETING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_by_hour() {
        assert!(MORNING_GREETINGS.contains(&greeting_for_hour(5)));
        assert!(MORNING_GREETINGS.contains(&greeting_for_hour(11)));
        assert_eq!(greeting_for_hour(12), AFTERNOON_GREETING);
        assert_eq!(greeting_for_hour(17), AFTERNOON_GREETING);
        assert_eq!(greeting_for_hour(18), EVENING_GREETING);
        assert_eq!(greeting_for_hour(3), EVENING_GREETING);
    }
}
