use std::str::FromStr;
use std::sync::OnceLock;

use rust_decimal::Decimal;

use super::numbers::{parse_count, parse_number, NUM};
use super::rules::{Rule, RuleTable};

const WORKERS: &str = r"(?:guys?|painters?|people|workers?|men|helpers?|of us)";

fn crew_in_range(count: u32) -> Option<u32> {
    (1..=50).contains(&count).then_some(count)
}

pub fn crew_rules() -> &'static RuleTable<u32> {
    static TABLE: OnceLock<RuleTable<u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "solo",
                r"(?i)\b(?:just me|only me|solo|by myself|on my own)\b(\s+and\b)?",
                |caps| caps.get(1).is_none().then_some(1),
            ),
            Rule::new("me_and_n", &format!(r"(?i)\bme and {NUM}\b"), |caps| {
                parse_count(&caps[1]).and_then(|others| crew_in_range(others + 1))
            }),
            Rule::new(
                "me_and_partner",
                r"(?i)\bme and (?:my|a) (?:partner|buddy|helper|brother|son|guy)\b",
                |_| Some(2),
            ),
            Rule::new("crew_of_n", &format!(r"(?i)\bcrew of {NUM}\b"), |caps| {
                parse_count(&caps[1]).and_then(crew_in_range)
            }),
            Rule::new("n_workers", &format!(r"(?i)\b{NUM}\s+{WORKERS}\b"), |caps| {
                parse_count(&caps[1]).and_then(crew_in_range)
            }),
        ])
    })
}

fn days_in_range(days: Decimal) -> Option<Decimal> {
    (days > Decimal::ZERO && days <= Decimal::from(365)).then_some(days)
}

pub fn days_rules() -> &'static RuleTable<Decimal> {
    static TABLE: OnceLock<RuleTable<Decimal>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "day_and_half",
                r"(?i)\b(?:a|one|1)\s+(?:and\s+a\s+half\s+days?|day\s+and\s+a\s+half)\b",
                |_| Some(Decimal::new(15, 1)),
            ),
            Rule::new("n_and_half", &format!(r"(?i)\b{NUM}\s+and\s+a\s+half\s+days\b"), |caps| {
                parse_number(&caps[1]).and_then(|days| days_in_range(days + Decimal::new(5, 1)))
            }),
            Rule::new("half_day", r"(?i)\bhalf\s+(?:a\s+)?day\b", |_| Some(Decimal::new(5, 1))),
            Rule::new("n_days", &format!(r"(?i)\b{NUM}(?:\s+|-)(?:full\s+)?days?\b"), |caps| {
                parse_number(&caps[1]).and_then(days_in_range)
            }),
            Rule::new("n_weeks", &format!(r"(?i)\b{NUM}\s+(?:full\s+)?weeks?\b"), |caps| {
                parse_number(&caps[1]).and_then(|weeks| days_in_range(weeks * Decimal::from(5)))
            }),
            Rule::new("a_week", r"(?i)\ba\s+(?:full\s+)?week\b", |_| Some(Decimal::from(5))),
        ])
    })
}

pub fn hours_rules() -> &'static RuleTable<Decimal> {
    static TABLE: OnceLock<RuleTable<Decimal>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "n_hours_per_day",
                &format!(r"(?i)\b{NUM}\s+hours?\s+(?:per|a|an|each|every)\s+day\b"),
                |caps| parse_number(&caps[1]).filter(|hours| hours_in_range(*hours)),
            ),
            Rule::new("n_hour_days", &format!(r"(?i)\b{NUM}[-\s]hour\s+days?\b"), |caps| {
                parse_number(&caps[1]).filter(|hours| hours_in_range(*hours))
            }),
        ])
    })
}

fn hours_in_range(hours: Decimal) -> bool {
    hours >= Decimal::ONE && hours <= Decimal::from(24)
}

/// Rates outside this window are treated as unrelated numbers.
fn rate_in_window(rate: &str) -> Option<Decimal> {
    let rate = Decimal::from_str(rate).ok()?;
    (rate >= Decimal::from(20) && rate <= Decimal::from(200)).then_some(rate)
}

pub fn rate_rules() -> &'static RuleTable<Decimal> {
    static TABLE: OnceLock<RuleTable<Decimal>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "dollars_per_hour",
                r"(?i)\$\s?(\d+(?:\.\d{1,2})?)\s*(?:an|per|a|/)\s*(?:hour|hr)\b",
                |caps| rate_in_window(&caps[1]),
            ),
            Rule::new(
                "n_per_hour",
                r"(?i)\b(\d+(?:\.\d{1,2})?)\s*(?:dollars|bucks)?\s*(?:an|per|a|/)\s*(?:hour|hr)\b",
                |caps| rate_in_window(&caps[1]),
            ),
            Rule::new(
                "rate_is",
                r"(?i)\brate\s+(?:is|of|will be|'s)\s*\$?\s*(\d+(?:\.\d{1,2})?)",
                |caps| rate_in_window(&caps[1]),
            ),
            Rule::new(
                "charging",
                r"(?i)\bcharg(?:e|ing)\s+\$?\s*(\d+(?:\.\d{1,2})?)",
                |caps| rate_in_window(&caps[1]),
            ),
        ])
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{crew_rules, days_rules, hours_rules, rate_rules};

    fn crew(text: &str) -> Option<u32> {
        crew_rules().first_in(text).map(|(_, value)| value)
    }

    fn days(text: &str) -> Option<Decimal> {
        days_rules().first_in(text).map(|(_, value)| value)
    }

    fn rate(text: &str) -> Option<Decimal> {
        rate_rules().first_in(text).map(|(_, value)| value)
    }

    #[test]
    fn crew_size_alternatives() {
        assert_eq!(crew("it's just me on this one"), Some(1));
        assert_eq!(crew("just me and two guys"), Some(3));
        assert_eq!(crew("me and a couple of helpers"), Some(3));
        assert_eq!(crew("me and my partner"), Some(2));
        assert_eq!(crew("a crew of 4"), Some(4));
        assert_eq!(crew("2 guys"), Some(2));
        assert_eq!(crew("three painters"), Some(3));
        assert_eq!(crew("500 people live here"), None);
        assert_eq!(crew("10 gallons"), None);
    }

    #[test]
    fn duration_alternatives() {
        assert_eq!(days("3 days"), Some(Decimal::from(3)));
        assert_eq!(days("about a day and a half"), Some(Decimal::new(15, 1)));
        assert_eq!(days("two and a half days"), Some(Decimal::new(25, 1)));
        assert_eq!(days("just half a day"), Some(Decimal::new(5, 1)));
        assert_eq!(days("a week"), Some(Decimal::from(5)));
        assert_eq!(days("2 weeks"), Some(Decimal::from(10)));
        assert_eq!(days("five-day job"), Some(Decimal::from(5)));
        assert_eq!(days("8 hours a day"), None);
    }

    #[test]
    fn hours_per_day_patterns() {
        let hours = |text: &str| hours_rules().first_in(text).map(|(_, value)| value);
        assert_eq!(hours("we work 10 hours a day"), Some(Decimal::from(10)));
        assert_eq!(hours("six hour days"), Some(Decimal::from(6)));
        assert_eq!(hours("40 hours per day"), None);
    }

    #[test]
    fn hourly_rate_is_windowed() {
        assert_eq!(rate("$65 an hour"), Some(Decimal::from(65)));
        assert_eq!(rate("we do 70 per hour"), Some(Decimal::from(70)));
        assert_eq!(rate("my rate is $55"), Some(Decimal::from(55)));
        assert_eq!(rate("charging 80 for labor"), Some(Decimal::from(80)));
        assert_eq!(rate("$500 an hour"), None);
        assert_eq!(rate("8 hours a day"), None);
    }

    #[test]
    fn later_rate_in_the_same_turn_wins_within_a_rule() {
        assert_eq!(rate("$60 an hour, no wait, $70 an hour"), Some(Decimal::from(70)));
    }
}
