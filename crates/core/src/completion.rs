use serde::{Deserialize, Serialize};

use crate::domain::draft::{Draft, DraftField};

/// Required fields in the order they are reported as missing.
pub const REQUIRED_FIELDS: [DraftField; 5] = [
    DraftField::CustomerName,
    DraftField::ProjectType,
    DraftField::NumberOfPainters,
    DraftField::EstimatedDays,
    DraftField::HourlyRate,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub percent: u8,
    pub missing: Vec<String>,
}

impl CompletionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn meets(&self, threshold_pct: u8) -> bool {
        self.percent >= threshold_pct
    }
}

pub fn is_present(draft: &Draft, field: DraftField) -> bool {
    match field {
        DraftField::CustomerName => {
            draft.customer_name.as_deref().map(|name| !name.trim().is_empty()).unwrap_or(false)
        }
        DraftField::Address => draft.address.is_some(),
        DraftField::Phone => draft.phone.is_some(),
        DraftField::Email => draft.email.is_some(),
        DraftField::ProjectType => draft.project_type.is_some(),
        DraftField::Areas => !draft.areas.is_empty(),
        DraftField::NumberOfPainters => draft.number_of_painters.is_some(),
        DraftField::EstimatedDays => draft.estimated_days.is_some(),
        DraftField::HoursPerDay => draft.hours_per_day.is_some(),
        DraftField::HourlyRate => draft.hourly_rate.is_some(),
        DraftField::PaintItems => !draft.paint_items.is_empty(),
        DraftField::Colors => !draft.colors.is_empty(),
        DraftField::ScopeOfWork => !draft.scope_of_work.is_empty(),
        DraftField::AddOns => !draft.add_ons.is_empty(),
        DraftField::MarkupPct => draft.markup_pct.is_some(),
        DraftField::TaxRatePct => draft.tax_rate_pct.is_some(),
    }
}

pub fn completion(draft: &Draft) -> CompletionReport {
    let missing = REQUIRED_FIELDS
        .iter()
        .filter(|field| !is_present(draft, **field))
        .map(|field| field.label().to_string())
        .collect::<Vec<_>>();
    let present = REQUIRED_FIELDS.len() - missing.len();
    let percent = ((present * 100) as f64 / REQUIRED_FIELDS.len() as f64).round() as u8;
    CompletionReport { percent, missing }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::completion;
    use crate::domain::draft::{Draft, ProjectType};

    #[test]
    fn empty_draft_is_zero_percent_with_all_labels() {
        let report = completion(&Draft::new(Utc::now()));
        assert_eq!(report.percent, 0);
        assert_eq!(
            report.missing,
            vec![
                "Customer name",
                "Project type",
                "Number of painters",
                "Estimated days",
                "Hourly rate"
            ]
        );
    }

    #[test]
    fn paused_draft_reports_forty_percent() {
        let mut draft = Draft::new(Utc::now());
        draft.customer_name = Some("John Smith".to_string());
        draft.project_type = Some(ProjectType::Interior);

        let report = completion(&draft);
        assert_eq!(report.percent, 40);
        assert_eq!(report.missing, vec!["Number of painters", "Estimated days", "Hourly rate"]);
        assert!(report.meets(40));
        assert!(!report.meets(100));
    }

    #[test]
    fn every_required_field_set_is_complete() {
        let mut draft = Draft::new(Utc::now());
        draft.customer_name = Some("Ana".to_string());
        draft.project_type = Some(ProjectType::Both);
        draft.number_of_painters = Some(2);
        draft.estimated_days = Some(Decimal::new(5, 1));
        draft.hourly_rate = Some(Decimal::from(70));

        let report = completion(&draft);
        assert_eq!(report.percent, 100);
        assert!(report.is_complete());
    }

    #[test]
    fn blank_names_do_not_count() {
        let mut draft = Draft::new(Utc::now());
        draft.customer_name = Some("   ".to_string());
        assert_eq!(completion(&draft).percent, 0);
    }
}
