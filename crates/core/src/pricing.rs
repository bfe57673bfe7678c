use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessDefaults;
use crate::domain::draft::{Draft, DraftId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub draft_id: DraftId,
    pub steps: Vec<PricingTraceStep>,
}

/// Derived figures for a draft snapshot.
///
/// `labor_cost` stays `None` until both crew size and duration are known;
/// it is never reported as a misleading zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftFinancials {
    pub labor_cost: Option<Decimal>,
    pub material_subtotal: Decimal,
    pub material_markup: Decimal,
    pub material_tax: Decimal,
    pub add_on_total: Decimal,
    pub estimate_total: Decimal,
    pub trace: PricingTrace,
}

pub trait Recalculator: Send + Sync {
    fn recalculate(&self, draft: &Draft) -> DraftFinancials;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicRecalculator {
    defaults: BusinessDefaults,
}

impl DeterministicRecalculator {
    pub fn new(defaults: BusinessDefaults) -> Self {
        Self { defaults }
    }

    /// Writes the derived figures back onto the draft.
    pub fn apply(&self, draft: &mut Draft) -> DraftFinancials {
        let financials = self.recalculate(draft);
        draft.labor_cost = financials.labor_cost;
        draft.material_subtotal = financials.material_subtotal;
        draft.estimate_total = financials.estimate_total;
        financials
    }

    pub fn is_consistent(&self, draft: &Draft) -> bool {
        let financials = self.recalculate(draft);
        financials.labor_cost == draft.labor_cost
            && financials.material_subtotal == draft.material_subtotal
            && financials.estimate_total == draft.estimate_total
    }
}

impl Recalculator for DeterministicRecalculator {
    fn recalculate(&self, draft: &Draft) -> DraftFinancials {
        recalculate_with_trace(draft, &self.defaults)
    }
}

pub fn labor_cost(draft: &Draft, defaults: &BusinessDefaults) -> Option<Decimal> {
    let painters = Decimal::from(draft.number_of_painters?);
    let days = draft.estimated_days?;
    let hours = draft.hours_per_day.unwrap_or(defaults.hours_per_day);
    let rate = draft.hourly_rate.unwrap_or(defaults.hourly_rate);
    Some(round_money(painters * days * hours * rate))
}

pub fn material_subtotal(draft: &Draft) -> Decimal {
    round_money(draft.paint_items.iter().map(|item| item.line_total()).sum())
}

pub fn recalculate_with_trace(draft: &Draft, defaults: &BusinessDefaults) -> DraftFinancials {
    let hundred = Decimal::ONE_HUNDRED;
    let markup_pct = draft.markup_pct.unwrap_or(defaults.markup_pct);
    let tax_rate_pct = draft.tax_rate_pct.unwrap_or(defaults.tax_rate_pct);

    let labor_cost = labor_cost(draft, defaults);
    let material_subtotal = material_subtotal(draft);
    let material_markup = round_money(material_subtotal * markup_pct / hundred);
    let material_tax = round_money((material_subtotal + material_markup) * tax_rate_pct / hundred);
    let add_on_total = round_money(draft.add_ons.iter().map(|add_on| add_on.cost()).sum());
    let estimate_total = round_money(
        labor_cost.unwrap_or(Decimal::ZERO)
            + material_subtotal
            + material_markup
            + material_tax
            + add_on_total,
    );

    let mut steps = Vec::with_capacity(6);
    steps.push(PricingTraceStep {
        stage: "labor".to_string(),
        detail: match labor_cost {
            Some(_) => "painters * days * hours_per_day * hourly_rate".to_string(),
            None => "unset: crew size or duration unknown".to_string(),
        },
        amount: labor_cost.unwrap_or(Decimal::ZERO),
    });
    steps.push(PricingTraceStep {
        stage: "materials".to_string(),
        detail: "sum(gallons * price_per_gallon)".to_string(),
        amount: material_subtotal,
    });
    steps.push(PricingTraceStep {
        stage: "markup".to_string(),
        detail: format!("materials * {markup_pct}%"),
        amount: material_markup,
    });
    steps.push(PricingTraceStep {
        stage: "tax".to_string(),
        detail: format!("(materials + markup) * {tax_rate_pct}%"),
        amount: material_tax,
    });
    steps.push(PricingTraceStep {
        stage: "add_ons".to_string(),
        detail: "sum(hours * hourly_rate)".to_string(),
        amount: add_on_total,
    });
    steps.push(PricingTraceStep {
        stage: "total".to_string(),
        detail: "labor + materials + markup + tax + add_ons".to_string(),
        amount: estimate_total,
    });

    DraftFinancials {
        labor_cost,
        material_subtotal,
        material_markup,
        material_tax,
        add_on_total,
        estimate_total,
        trace: PricingTrace { draft_id: draft.id.clone(), steps },
    }
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{DeterministicRecalculator, Recalculator};
    use crate::domain::draft::{AddOn, Draft, PaintItem};

    fn duration_for_body() -> PaintItem {
        PaintItem {
            area: "body".to_string(),
            product: "duration".to_string(),
            gallons: Decimal::from(10),
            finish: "flat".to_string(),
            color: None,
            coats: 2,
            price_per_gallon: Decimal::from(75),
        }
    }

    #[test]
    fn labor_uses_default_hours_and_rate() {
        let mut draft = Draft::new(Utc::now());
        draft.number_of_painters = Some(2);
        draft.estimated_days = Some(Decimal::from(3));
        draft.hourly_rate = Some(Decimal::from(65));

        let financials = DeterministicRecalculator::default().recalculate(&draft);
        assert_eq!(financials.labor_cost, Some(Decimal::from(3120)));
        assert_eq!(financials.estimate_total, Decimal::from(3120));
    }

    #[test]
    fn labor_is_unset_without_crew_or_days() {
        let mut draft = Draft::new(Utc::now());
        draft.number_of_painters = Some(2);
        draft.paint_items.push(duration_for_body());

        let financials = DeterministicRecalculator::default().recalculate(&draft);
        assert_eq!(financials.labor_cost, None);
        assert_eq!(financials.material_subtotal, Decimal::from(750));
        // 750 + 20% markup = 900, + 8% tax = 972
        assert_eq!(financials.estimate_total, Decimal::from(972));
    }

    #[test]
    fn total_combines_every_component() {
        let mut draft = Draft::new(Utc::now());
        draft.number_of_painters = Some(1);
        draft.estimated_days = Some(Decimal::new(15, 1));
        draft.hours_per_day = Some(Decimal::from(6));
        draft.hourly_rate = Some(Decimal::from(50));
        draft.markup_pct = Some(Decimal::from(10));
        draft.tax_rate_pct = Some(Decimal::ZERO);
        draft.paint_items.push(duration_for_body());
        draft.add_ons.push(AddOn {
            description: "Carpentry".to_string(),
            hours: Decimal::from(2),
            hourly_rate: Decimal::from(50),
            rate_follows_draft: false,
        });

        let financials = DeterministicRecalculator::default().recalculate(&draft);
        assert_eq!(financials.labor_cost, Some(Decimal::from(450)));
        assert_eq!(financials.material_markup, Decimal::from(75));
        assert_eq!(financials.add_on_total, Decimal::from(100));
        assert_eq!(financials.estimate_total, Decimal::from(1375));
        assert_eq!(financials.trace.steps.len(), 6);
    }

    #[test]
    fn apply_keeps_stored_totals_consistent() {
        let recalculator = DeterministicRecalculator::default();
        let mut draft = Draft::new(Utc::now());
        draft.paint_items.push(duration_for_body());
        assert!(!recalculator.is_consistent(&draft));

        recalculator.apply(&mut draft);
        assert!(recalculator.is_consistent(&draft));

        draft.number_of_painters = Some(3);
        draft.estimated_days = Some(Decimal::from(2));
        assert!(!recalculator.is_consistent(&draft));
        recalculator.apply(&mut draft);
        assert!(recalculator.is_consistent(&draft));
        assert_eq!(draft.labor_cost, Some(Decimal::from(3120)));
    }
}
