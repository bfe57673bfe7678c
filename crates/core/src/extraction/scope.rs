use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::numbers::{group_thousands, parse_count, NUM};
use super::rules::Turn;

/// Canonical area names with their spoken aliases.
const AREAS: &[(&str, &[&str])] = &[
    ("master bedroom", &["master bedroom", "primary bedroom", "main bedroom"]),
    ("living room", &["living room", "front room"]),
    ("dining room", &["dining room"]),
    ("family room", &["family room", "den"]),
    ("laundry room", &["laundry room", "laundry"]),
    ("powder room", &["powder room", "half bath"]),
    ("kitchen", &["kitchen"]),
    ("bedroom", &["bedroom"]),
    ("bathroom", &["bathroom"]),
    ("hallway", &["hallway", "hall"]),
    ("entryway", &["entryway", "foyer"]),
    ("stairway", &["stairway", "staircase", "stairs"]),
    ("office", &["office", "study"]),
    ("basement", &["basement"]),
    ("garage", &["garage"]),
    ("closet", &["closet"]),
    ("front door", &["front door"]),
    ("garage door", &["garage door"]),
    ("siding", &["siding"]),
    ("trim", &["trim"]),
    ("deck", &["deck"]),
    ("fence", &["fence"]),
    ("porch", &["porch"]),
    ("shutters", &["shutters"]),
    ("soffits", &["soffits", "soffit"]),
    ("fascia", &["fascia"]),
];

fn area_pattern() -> &'static (Regex, Vec<(String, &'static str)>) {
    static PATTERN: OnceLock<(Regex, Vec<(String, &'static str)>)> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut aliases = AREAS
            .iter()
            .flat_map(|(canonical, aliases)| {
                aliases.iter().map(|alias| (alias.to_string(), *canonical))
            })
            .collect::<Vec<_>>();
        aliases.sort_by(|left, right| right.0.len().cmp(&left.0.len()));
        let alternation =
            aliases.iter().map(|(alias, _)| regex::escape(alias)).collect::<Vec<_>>().join("|");
        let regex = Regex::new(&format!(r"(?i)\b({alternation})(?:e?s)?\b"))
            .expect("area vocabulary compiles");
        (regex, aliases)
    })
}

fn canonical_area(alias: &str) -> Option<&'static str> {
    let (_, aliases) = area_pattern();
    aliases
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(alias))
        .map(|(_, canonical)| *canonical)
}

/// True when the phrase names a known area, with or without a plural ending.
pub fn is_area(phrase: &str) -> bool {
    let phrase = phrase.trim();
    canonical_area(phrase).is_some()
        || phrase.strip_suffix('s').and_then(canonical_area).is_some()
}

/// True for entries standing in for unnamed rooms, such as "3 bedrooms".
pub fn is_room_count(entry: &str) -> bool {
    entry
        .split_once(' ')
        .is_some_and(|(count, rest)| count.parse::<u32>().is_ok() && !rest.trim().is_empty())
}

fn room_count_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b{NUM}\s+(rooms|bedrooms|bathrooms)\b"))
            .expect("room count pattern compiles")
    })
}

fn square_footage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s*(?:square\s+(?:feet|foot)|sq\.?\s*ft\.?|sqft)")
            .expect("square footage pattern compiles")
    })
}

/// Named areas in transcript order, falling back to room counts ("3 rooms")
/// when nothing is named. Square footage is appended as an annotation.
pub fn areas(turns: &[Turn]) -> Vec<String> {
    let (pattern, _) = area_pattern();
    let mut named = Vec::new();
    let mut counted = Vec::new();

    for turn in turns {
        let count_spans = room_count_pattern()
            .captures_iter(&turn.text)
            .filter_map(|captures| {
                let span = captures.get(0)?.range();
                let count = parse_count(&captures[1])?;
                counted.push(format!("{count} {}", captures[2].to_ascii_lowercase()));
                Some(span)
            })
            .collect::<Vec<Range<usize>>>();

        for captures in pattern.captures_iter(&turn.text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if count_spans.iter().any(|span| span.contains(&whole.start())) {
                continue;
            }
            if let Some(canonical) = canonical_area(&captures[1]) {
                push_unique(&mut named, canonical.to_string());
            }
        }
    }

    let mut found = if named.is_empty() {
        counted.into_iter().fold(Vec::new(), |mut acc, entry| {
            push_unique(&mut acc, entry);
            acc
        })
    } else {
        named
    };

    for turn in turns {
        for captures in square_footage_pattern().captures_iter(&turn.text) {
            let digits = captures[1].replace(',', "");
            if let Ok(value) = digits.parse::<u64>() {
                if value >= 50 {
                    push_unique(&mut found, format!("~{} sq ft", group_thousands(value)));
                }
            }
        }
    }

    found
}

/// Prep tasks, long forms listed before their short forms.
const PREP_TASKS: &[&str] = &[
    "drywall repair",
    "wood repair",
    "furniture moving",
    "sanding",
    "sand",
    "patching",
    "patch",
    "caulking",
    "caulk",
    "priming",
    "prime",
    "scraping",
    "scrape",
    "masking",
    "mask",
    "taping",
    "tape",
    "cleaning",
    "clean",
    "prepping",
    "prep",
];

/// (short form, long form) pairs; the short form is dropped when both appear.
const SYNONYMS: &[(&str, &str)] = &[
    ("sand", "sanding"),
    ("patch", "patching"),
    ("caulk", "caulking"),
    ("prime", "priming"),
    ("scrape", "scraping"),
    ("mask", "masking"),
    ("tape", "taping"),
    ("clean", "cleaning"),
    ("prep", "prepping"),
];

fn prep_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternation = PREP_TASKS.iter().map(|task| regex::escape(task)).collect::<Vec<_>>();
        Regex::new(&format!(r"(?i)\b({})\b", alternation.join("|")))
            .expect("prep vocabulary compiles")
    })
}

pub fn prep_tasks(turns: &[Turn]) -> Vec<String> {
    let mut tasks = Vec::new();
    for turn in turns {
        for captures in prep_pattern().captures_iter(&turn.text) {
            push_unique(&mut tasks, captures[1].to_ascii_lowercase());
        }
    }
    tasks
}

pub fn collapse_synonyms(tasks: Vec<String>) -> Vec<String> {
    let has = |needle: &str| tasks.iter().any(|task| task.eq_ignore_ascii_case(needle));
    let dropped = SYNONYMS
        .iter()
        .filter(|(short, long)| has(short) && has(long))
        .map(|(short, _)| *short)
        .collect::<Vec<_>>();
    tasks
        .into_iter()
        .filter(|task| !dropped.iter().any(|short| task.eq_ignore_ascii_case(short)))
        .collect()
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|existing| existing.eq_ignore_ascii_case(&value)) {
        list.push(value);
    }
}
