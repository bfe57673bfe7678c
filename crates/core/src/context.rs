use rust_decimal::Decimal;

use crate::completion::completion;
use crate::domain::draft::{ColorAssignment, Draft};

pub const RESUME_INSTRUCTION: &str = "Ask about the missing items one at a time. \
Never re-ask for anything listed under ALREADY COLLECTED.";

/// Human-readable lines for every populated field, in summary order.
pub fn summary_lines(draft: &Draft) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
            lines.push(format!("{label}: {value}"));
        }
    };

    line("Customer", draft.customer_name.clone());
    line("Address", draft.address.clone());
    line("Phone", draft.phone.clone());
    line("Email", draft.email.clone());
    line("Project type", draft.project_type.map(|kind| kind.label().to_string()));
    line("Areas", joined(draft.areas.iter().cloned(), ", "));
    line("Crew", draft.number_of_painters.map(|count| plural(count, "painter")));
    line(
        "Duration",
        draft.estimated_days.map(|days| match draft.hours_per_day {
            Some(hours) => format!("{} days at {} hrs/day", days.normalize(), hours.normalize()),
            None => format!("{} days", days.normalize()),
        }),
    );
    line("Hourly rate", draft.hourly_rate.map(|rate| format!("{}/hr", money(rate))));
    line("Labor cost", draft.labor_cost.map(money));
    line(
        "Paint",
        joined(
            draft.paint_items.iter().map(|item| {
                format!(
                    "{} gal {} ({}) for {}",
                    item.gallons.normalize(),
                    item.product,
                    item.finish,
                    item.area
                )
            }),
            "; ",
        ),
    );
    line("Colors", joined(draft.colors.iter().map(color_line), "; "));
    line("Prep", joined(draft.scope_of_work.iter().cloned(), ", "));
    line(
        "Add-ons",
        joined(
            draft.add_ons.iter().map(|add_on| {
                format!(
                    "{} ({} hrs at {}/hr)",
                    add_on.description,
                    add_on.hours.normalize(),
                    money(add_on.hourly_rate)
                )
            }),
            "; ",
        ),
    );
    let total = (draft.estimate_total > Decimal::ZERO).then(|| money(draft.estimate_total));
    line("Estimated total", total);

    lines
}

/// Prompt fragment for resuming a paused voice session.
pub fn resume_context(draft: &Draft) -> String {
    let collected = summary_lines(draft);
    let report = completion(draft);

    let mut out = String::from("ALREADY COLLECTED:\n");
    if collected.is_empty() {
        out.push_str("- nothing yet\n");
    }
    for entry in &collected {
        out.push_str(&format!("- {entry}\n"));
    }

    out.push_str("\nSTILL NEEDED:\n");
    if report.missing.is_empty() {
        out.push_str("- nothing required\n");
    }
    for label in &report.missing {
        out.push_str(&format!("- {label}\n"));
    }

    out.push('\n');
    out.push_str(RESUME_INSTRUCTION);
    out
}

fn color_line(assignment: &ColorAssignment) -> String {
    if assignment.color.eq_ignore_ascii_case(&assignment.sw_code) {
        format!("{}: {}", assignment.area, assignment.sw_code)
    } else {
        format!("{}: {} ({})", assignment.area, assignment.color, assignment.sw_code)
    }
}

fn joined(values: impl Iterator<Item = String>, separator: &str) -> Option<String> {
    let values = values.collect::<Vec<_>>();
    (!values.is_empty()).then(|| values.join(separator))
}

fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}
