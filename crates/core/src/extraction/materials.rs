use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use rust_decimal::Decimal;

use super::numbers::{parse_number, NUM};
use super::rules::Turn;
use super::scope::is_area;
use crate::domain::draft::PaintItem;

/// Price used for products missing from the table.
pub const FALLBACK_PRICE_PER_GALLON: i64 = 50;
pub const DEFAULT_COATS: u32 = 2;

struct Product {
    name: &'static str,
    aliases: &'static [&'static str],
    price_per_gallon: i64,
}

const PRODUCTS: &[Product] = &[
    Product { name: "duration", aliases: &["duration"], price_per_gallon: 75 },
    Product { name: "emerald", aliases: &["emerald"], price_per_gallon: 85 },
    Product { name: "superpaint", aliases: &["superpaint", "super paint"], price_per_gallon: 60 },
    Product { name: "cashmere", aliases: &["cashmere"], price_per_gallon: 65 },
    Product { name: "a-100", aliases: &["a-100", "a100", "a 100"], price_per_gallon: 50 },
    Product { name: "promar", aliases: &["promar 200", "promar", "pro mar"], price_per_gallon: 45 },
    Product {
        name: "proclassic",
        aliases: &["proclassic", "pro classic", "pro-classic"],
        price_per_gallon: 70,
    },
    Product { name: "loxon", aliases: &["loxon"], price_per_gallon: 60 },
    Product { name: "harmony", aliases: &["harmony"], price_per_gallon: 55 },
    Product { name: "captivate", aliases: &["captivate"], price_per_gallon: 58 },
];

const BRAND: &str = r"(?:sherwin[- ]williams|sw|benjamin moore|behr|ppg|valspar)";
const FINISH: &str = r"(flat|matte|eggshell|satin|semi[- ]gloss|high[- ]gloss|gloss)";
const AREA: &str = r"(?:\s+(?:for|on|in)\s+(?:the\s+)?([a-z]+(?:\s+[a-z]+)?))?";
const NOT_A_PRODUCT: &[&str] =
    &["the", "that", "this", "it", "each", "those", "them", "what", "sw"];

pub fn price_per_gallon(product: &str) -> Decimal {
    let price = lookup(product).map(|product| product.price_per_gallon);
    Decimal::from(price.unwrap_or(FALLBACK_PRICE_PER_GALLON))
}

/// Semi-gloss for the "classic" family, flat for everything else.
pub fn default_finish(product: &str) -> &'static str {
    if product.to_ascii_lowercase().contains("classic") {
        "semi-gloss"
    } else {
        "flat"
    }
}

fn lookup(spoken: &str) -> Option<&'static Product> {
    let spoken = spoken.trim().to_ascii_lowercase();
    PRODUCTS.iter().find(|product| {
        product.name == spoken || product.aliases.iter().any(|alias| *alias == spoken)
    })
}

fn product_alternation() -> String {
    let mut aliases =
        PRODUCTS.iter().flat_map(|product| product.aliases.iter()).collect::<Vec<_>>();
    aliases.sort_by(|left, right| right.len().cmp(&left.len()));
    aliases.iter().map(|alias| regex::escape(alias)).collect::<Vec<_>>().join("|")
}

fn gallons_of_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let products = product_alternation();
        Regex::new(&format!(
            r"(?i)\b{NUM}\s+gallons?\s+of\s+(?:the\s+)?(?:{BRAND}\s+)?(?:{FINISH}\s+)?({products}|[a-z][a-z0-9-]*)(?:\s+{FINISH})?(?:\s+(?:paint|primer))?{AREA}"
        ))
        .expect("gallons-of pattern compiles")
    })
}

fn product_gallons_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let products = product_alternation();
        Regex::new(&format!(
            r"(?i)\b({products})(?:\s+{FINISH})?[,:]?\s+{NUM}\s+gallons?\b{AREA}"
        ))
        .expect("product-gallons pattern compiles")
    })
}

/// Paint line items in transcript order, deduplicated by gallons, product and area.
pub fn paint_items(turns: &[Turn]) -> Vec<PaintItem> {
    let mut items: Vec<PaintItem> = Vec::new();
    let mut push = |item: PaintItem| {
        if !items.iter().any(|existing| existing.same_line(&item)) {
            items.push(item);
        }
    };

    for turn in turns {
        let mut covered: Vec<Range<usize>> = Vec::new();
        for captures in gallons_of_pattern().captures_iter(&turn.text) {
            if let Some(whole) = captures.get(0) {
                covered.push(whole.range());
            }
            let finish = captures.get(2).or_else(|| captures.get(4)).map(|m| m.as_str());
            if let Some(item) = line_item(&captures[1], &captures[3], finish, area(&captures, 5)) {
                push(item);
            }
        }

        for captures in product_gallons_pattern().captures_iter(&turn.text) {
            let start = captures.get(0).map(|whole| whole.start()).unwrap_or_default();
            if covered.iter().any(|span| span.contains(&start)) {
                continue;
            }
            let finish = captures.get(2).map(|m| m.as_str());
            if let Some(item) = line_item(&captures[3], &captures[1], finish, area(&captures, 4)) {
                push(item);
            }
        }
    }

    items
}

fn line_item(
    gallons: &str,
    product: &str,
    finish: Option<&str>,
    area: Option<String>,
) -> Option<PaintItem> {
    let gallons = parse_number(gallons)?;
    if gallons < Decimal::ONE || gallons > Decimal::from(100) {
        return None;
    }
    let spoken = product.trim().to_ascii_lowercase();
    if NOT_A_PRODUCT.contains(&spoken.as_str()) {
        return None;
    }
    let product = lookup(&spoken).map(|known| known.name.to_string()).unwrap_or(spoken);
    let finish = finish.map(normalize_finish).unwrap_or_else(|| default_finish(&product).into());

    Some(PaintItem {
        area: area.unwrap_or_else(|| "general".to_string()),
        price_per_gallon: price_per_gallon(&product),
        product,
        gallons,
        finish,
        color: None,
        coats: DEFAULT_COATS,
    })
}

fn area(captures: &Captures<'_>, group: usize) -> Option<String> {
    let phrase = captures.get(group)?.as_str().to_ascii_lowercase();
    if is_area(&phrase) {
        return Some(phrase);
    }
    phrase.split_whitespace().next().map(str::to_string)
}

fn normalize_finish(finish: &str) -> String {
    finish.to_ascii_lowercase().replace(' ', "-")
}
