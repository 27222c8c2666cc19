//! Dining dialog: intent detection, slot elicitation and validation.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveTime};

use super::queue::DiningRequest;

pub const GREETING: &str = "Hi there, how can I help?";
pub const THANK_YOU: &str = "You’re welcome.";
pub const NOT_UNDERSTOOD: &str = "Sorry, I couldn't understand that.";
pub const ALL_SET: &str =
    "You’re all set. Expect my suggestions shortly! I will notify you by email.";

pub const ALLOWED_CUISINES: [&str; 5] = ["chinese", "japanese", "italian", "mexican", "american"];
const ALLOWED_LOCATIONS: [&str; 4] = ["manhattan, ny", "manhattan", "new york", "nyc"];

const GREETING_WORDS: [&str; 5] = ["hi", "hello", "hey", "howdy", "greetings"];
const THANKS_WORDS: [&str; 4] = ["thanks", "thank", "thx", "ty"];
const DINING_WORDS: [&str; 12] = [
    "restaurant",
    "restaurants",
    "food",
    "eat",
    "dining",
    "dinner",
    "lunch",
    "brunch",
    "hungry",
    "suggestion",
    "suggestions",
    "recommend",
];

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    ThankYou,
    DiningSuggestions,
    Unknown,
}

/// Lowercased alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Classify a free-form utterance.
#[must_use]
pub fn classify(text: &str) -> Intent {
    let words = words(text);
    let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));

    if has(&DINING_WORDS) || has(&ALLOWED_CUISINES) {
        Intent::DiningSuggestions
    } else if has(&THANKS_WORDS) {
        Intent::ThankYou
    } else if has(&GREETING_WORDS) {
        Intent::Greeting
    } else {
        Intent::Unknown
    }
}

/// Dialog parameters, in elicitation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Location,
    Cuisine,
    DiningDate,
    DiningTime,
    NumberOfPeople,
    Email,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Location,
        Slot::Cuisine,
        Slot::DiningDate,
        Slot::DiningTime,
        Slot::NumberOfPeople,
        Slot::Email,
    ];

    /// Question asked when the slot is empty.
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Slot::Location => "Great. Which city or area are you looking to dine in?",
            Slot::Cuisine => "Got it. What cuisine would you like to try?",
            Slot::DiningDate => "What date would you like to dine?",
            Slot::DiningTime => "What time would you like to dine?",
            Slot::NumberOfPeople => "Ok, how many people are in your party?",
            Slot::Email => {
                "Perfect. What email address should I send my suggestions to?"
            }
        }
    }
}

/// Validate a location answer; the whole answer must name Manhattan.
pub fn validate_location(text: &str) -> Result<String, String> {
    let lowered = text.trim().to_lowercase();
    if ALLOWED_LOCATIONS.contains(&lowered.as_str()) {
        Ok("manhattan".to_string())
    } else {
        Err(format!(
            "Sorry, I can't fulfill requests for {}. Please enter a valid location in Manhattan.",
            text.trim()
        ))
    }
}

/// Whether a free-form utterance mentions an allowed location as whole words.
fn mentions_location(text: &str) -> bool {
    let said = words(text);
    ALLOWED_LOCATIONS.iter().any(|loc| {
        let phrase = words(loc);
        said.windows(phrase.len()).any(|window| window == phrase.as_slice())
    })
}

/// Validate a cuisine answer.
pub fn validate_cuisine(text: &str) -> Result<String, String> {
    words(text)
        .into_iter()
        .find(|w| ALLOWED_CUISINES.contains(&w.as_str()))
        .ok_or_else(|| {
            format!(
                "Sorry, I currently support cuisines like {}. What cuisine would you like?",
                ALLOWED_CUISINES.join(", ")
            )
        })
}

/// `local@domain.tld` with no whitespace and a single `@`.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    clean(local) && clean(host) && clean(tld)
}

/// Validate an email answer.
pub fn validate_email(text: &str) -> Result<String, String> {
    let email = text.trim();
    if is_valid_email(email) {
        Ok(email.to_string())
    } else {
        Err("That email address looks invalid. Please provide a valid email address.".to_string())
    }
}

/// Validate a party size.
pub fn validate_people(text: &str) -> Result<String, String> {
    words(text)
        .iter()
        .find_map(|w| w.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.to_string())
        .ok_or_else(|| "Please tell me how many people, for example 2.".to_string())
}

/// Validate a dining date relative to `today`.
pub fn validate_date(text: &str, today: NaiveDate) -> Result<String, String> {
    let lowered = text.trim().to_lowercase();
    let date = match lowered.as_str() {
        "today" | "tonight" => Some(today),
        "tomorrow" => today.succ_opt(),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(other, "%m/%d/%Y"))
            .ok(),
    };
    match date {
        Some(date) if date < today => Err("Please pick a date that is not in the past.".to_string()),
        Some(date) => Ok(date.format("%Y-%m-%d").to_string()),
        None => Err("Please give me a date like 2026-10-20, today or tomorrow.".to_string()),
    }
}

/// Validate a dining time, normalized to `HH:MM`.
pub fn validate_time(text: &str) -> Result<String, String> {
    let compact: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    let parsed = match compact.as_str() {
        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
        _ => parse_clock(&compact),
    };
    parsed
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(|| "Please give me a time like 19:00 or 7pm.".to_string())
}

fn parse_clock(compact: &str) -> Option<NaiveTime> {
    let (clock, offset) = if let Some(rest) = compact.strip_suffix("pm") {
        (rest, 12)
    } else if let Some(rest) = compact.strip_suffix("am") {
        (rest, 0)
    } else {
        return NaiveTime::parse_from_str(compact, "%H:%M").ok();
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    NaiveTime::from_hms_opt(hour % 12 + offset, minute, 0)
}

/// Slot values collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiningDialog {
    values: HashMap<Slot, String>,
    eliciting: Option<Slot>,
}

impl DiningDialog {
    /// Start a dialog, pre-filling what the opening utterance already says.
    #[must_use]
    pub fn from_utterance(text: &str) -> Self {
        let mut dialog = Self::default();
        if mentions_location(text) {
            dialog.values.insert(Slot::Location, "manhattan".to_string());
        }
        if let Ok(cuisine) = validate_cuisine(text) {
            dialog.values.insert(Slot::Cuisine, cuisine);
        }
        dialog
    }

    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }

    /// First empty slot, in elicitation order.
    #[must_use]
    pub fn next_missing(&self) -> Option<Slot> {
        Slot::ALL.into_iter().find(|s| !self.values.contains_key(s))
    }

    /// Feed an answer for the slot being elicited.
    ///
    /// Returns the re-prompt when the answer is rejected.
    pub fn answer(&mut self, text: &str, today: NaiveDate) -> Result<(), String> {
        let Some(slot) = self.eliciting else {
            return Ok(());
        };
        let value = match slot {
            Slot::Location => validate_location(text),
            Slot::Cuisine => validate_cuisine(text),
            Slot::DiningDate => validate_date(text, today),
            Slot::DiningTime => validate_time(text),
            Slot::NumberOfPeople => validate_people(text),
            Slot::Email => validate_email(text),
        }?;
        self.values.insert(slot, value);
        self.eliciting = None;
        Ok(())
    }

    /// Ask for the next empty slot, or return `None` when complete.
    pub fn elicit_next(&mut self) -> Option<&'static str> {
        self.eliciting = self.next_missing();
        self.eliciting.map(Slot::prompt)
    }

    /// The finished request, once every slot is filled.
    #[must_use]
    pub fn to_request(&self, user_id: Option<&str>) -> Option<DiningRequest> {
        let get = |slot| self.get(slot).map(ToString::to_string);
        Some(DiningRequest {
            location: get(Slot::Location)?,
            cuisine: get(Slot::Cuisine)?,
            date: get(Slot::DiningDate)?,
            time: get(Slot::DiningTime)?,
            people: get(Slot::NumberOfPeople)?,
            email: get(Slot::Email)?,
            user_id: user_id.map(ToString::to_string),
        })
    }
}

/// Dialogs in progress, keyed by session id.
#[derive(Debug, Default)]
pub struct DialogStore {
    inner: RwLock<HashMap<String, DiningDialog>>,
}

impl DialogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<DiningDialog> {
        self.inner.read().unwrap().get(session_id).cloned()
    }

    pub fn put(&self, session_id: &str, dialog: DiningDialog) {
        self.inner
            .write()
            .unwrap()
            .insert(session_id.to_string(), dialog);
    }

    pub fn remove(&self, session_id: &str) -> Option<DiningDialog> {
        self.inner.write().unwrap().remove(session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A user's most recent completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSearch {
    pub location: String,
    pub cuisine: String,
}

/// Last searches keyed by user id.
#[derive(Debug, Default)]
pub struct UserStateStore {
    inner: RwLock<HashMap<String, LastSearch>>,
}

impl UserStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, user_id: &str, search: LastSearch) {
        self.inner
            .write()
            .unwrap()
            .insert(user_id.to_string(), search);
    }

    #[must_use]
    pub fn last_search(&self, user_id: &str) -> Option<LastSearch> {
        self.inner.read().unwrap().get(user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Hello there"), Intent::Greeting);
        assert_eq!(classify("thank you!"), Intent::ThankYou);
        assert_eq!(classify("I need restaurant suggestions"), Intent::DiningSuggestions);
        assert_eq!(classify("some japanese please"), Intent::DiningSuggestions);
        assert_eq!(classify("what is the weather"), Intent::Unknown);
        assert_eq!(classify("this"), Intent::Unknown);
    }

    #[test]
    fn test_location_validation() {
        assert_eq!(validate_location("NYC").unwrap(), "manhattan");
        assert_eq!(validate_location("Manhattan, NY").unwrap(), "manhattan");
        assert_eq!(
            validate_location("Boston").unwrap_err(),
            "Sorry, I can't fulfill requests for Boston. Please enter a valid location in Manhattan."
        );
        assert_eq!(validate_location("  new york ").unwrap(), "manhattan");
        assert!(validate_location("Brooklyn, New York").is_err());
        assert!(validate_location("Jersey City near NYC").is_err());
        assert!(validate_location("anyclue").is_err());
    }

    #[test]
    fn test_opening_utterance_location_needs_whole_words() {
        let dialog = DiningDialog::from_utterance("italian near anyclue");
        assert_eq!(dialog.get(Slot::Location), None);
        assert_eq!(dialog.get(Slot::Cuisine), Some("italian"));

        let dialog = DiningDialog::from_utterance("dinner in Manhattan, NY please");
        assert_eq!(dialog.get(Slot::Location), Some("manhattan"));

        let dialog = DiningDialog::from_utterance("food around new yorkshire");
        assert_eq!(dialog.get(Slot::Location), None);
    }

    #[test]
    fn test_cuisine_validation() {
        assert_eq!(validate_cuisine("Japanese food").unwrap(), "japanese");
        let err = validate_cuisine("thai").unwrap_err();
        assert_eq!(
            err,
            "Sorry, I currently support cuisines like chinese, japanese, italian, mexican, american. What cuisine would you like?"
        );
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@@b.c"));
        assert!(!is_valid_email("@b.c"));
        assert_eq!(validate_email(" me@example.com ").unwrap(), "me@example.com");
        assert!(validate_email("nope").unwrap_err().contains("looks invalid"));
    }

    #[test]
    fn test_people_date_time() {
        assert_eq!(validate_people("4 of us").unwrap(), "4");
        assert!(validate_people("0").is_err());
        assert!(validate_people("a few").is_err());

        assert_eq!(validate_date("tomorrow", today()).unwrap(), "2026-10-16");
        assert_eq!(validate_date("Today", today()).unwrap(), "2026-10-15");
        assert_eq!(validate_date("10/20/2026", today()).unwrap(), "2026-10-20");
        assert!(validate_date("2026-10-01", today()).unwrap_err().contains("past"));
        assert!(validate_date("someday", today()).is_err());

        assert_eq!(validate_time("7pm").unwrap(), "19:00");
        assert_eq!(validate_time("7:30 p.m.").unwrap(), "19:30");
        assert_eq!(validate_time("12am").unwrap(), "00:00");
        assert_eq!(validate_time("12 pm").unwrap(), "12:00");
        assert_eq!(validate_time("18:45").unwrap(), "18:45");
        assert_eq!(validate_time("noon").unwrap(), "12:00");
        assert!(validate_time("13pm").is_err());
        assert!(validate_time("late").is_err());
    }

    #[test]
    fn test_dialog_flow() {
        let mut dialog = DiningDialog::from_utterance("chinese food in nyc");
        assert_eq!(dialog.get(Slot::Location), Some("manhattan"));
        assert_eq!(dialog.get(Slot::Cuisine), Some("chinese"));

        assert_eq!(dialog.elicit_next(), Some(Slot::DiningDate.prompt()));
        assert!(dialog.answer("yesterday-ish", today()).is_err());
        dialog.answer("tomorrow", today()).unwrap();

        assert_eq!(dialog.elicit_next(), Some(Slot::DiningTime.prompt()));
        dialog.answer("7pm", today()).unwrap();
        dialog.elicit_next();
        dialog.answer("2", today()).unwrap();
        dialog.elicit_next();
        assert!(dialog.to_request(None).is_none());
        dialog.answer("me@example.com", today()).unwrap();

        assert_eq!(dialog.elicit_next(), None);
        let request = dialog.to_request(Some("u-1")).unwrap();
        assert_eq!(request.cuisine, "chinese");
        assert_eq!(request.date, "2026-10-16");
        assert_eq!(request.time, "19:00");
        assert_eq!(request.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_stores() {
        let dialogs = DialogStore::new();
        dialogs.put("s", DiningDialog::default());
        assert_eq!(dialogs.len(), 1);
        assert!(dialogs.remove("s").is_some());
        assert!(dialogs.is_empty());

        let users = UserStateStore::new();
        assert!(users.last_search("u").is_none());
        users.save(
            "u",
            LastSearch {
                location: "manhattan".to_string(),
                cuisine: "italian".to_string(),
            },
        );
        assert_eq!(users.last_search("u").unwrap().cuisine, "italian");
    }
}
