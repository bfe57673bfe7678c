//! Conversion of a finished draft into the estimate store's write contract.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessDefaults;
use crate::domain::draft::Draft;
use crate::errors::DomainError;
use crate::pricing::labor_cost;

const PROJECT_NAME_AREAS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateCustomer {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub description: String,
    pub area: String,
    pub product: String,
    pub finish: String,
    pub color: Option<String>,
    pub coats: u32,
    pub gallons: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborLine {
    pub painters: u32,
    pub days: Decimal,
    pub hours_per_day: Decimal,
    pub hourly_rate: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnLine {
    pub description: String,
    pub hours: Decimal,
    pub hourly_rate: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatePayload {
    pub project_name: String,
    pub customer: EstimateCustomer,
    pub project_type: Option<String>,
    pub material_lines: Vec<MaterialLine>,
    pub labor_line: Option<LaborLine>,
    pub add_on_lines: Vec<AddOnLine>,
    pub scope: Vec<String>,
    pub markup_pct: Decimal,
    pub tax_rate_pct: Decimal,
    pub estimate_total: Decimal,
}

/// `"<customer> - <Type> (<first three areas>)"`, dropping the parts that are unknown.
pub fn project_name(draft: &Draft) -> String {
    let customer = draft.customer_name.as_deref().map(str::trim).unwrap_or_default();
    let mut name = customer.to_string();
    if let Some(kind) = draft.project_type {
        name.push_str(" - ");
        name.push_str(kind.label());
    }
    if !draft.areas.is_empty() {
        let areas =
            draft.areas.iter().take(PROJECT_NAME_AREAS).cloned().collect::<Vec<_>>().join(", ");
        name.push_str(&format!(" ({areas})"));
    }
    name
}

pub fn build_payload(
    draft: &Draft,
    defaults: &BusinessDefaults,
) -> Result<EstimatePayload, DomainError> {
    let customer_name = draft
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            DomainError::InvariantViolation(
                "a customer name is required before promoting a draft".to_string(),
            )
        })?;

    if let Some(estimate_id) = &draft.final_estimate_id {
        return Err(DomainError::DraftAlreadyLinked {
            draft_id: draft.id.clone(),
            estimate_id: estimate_id.clone(),
        });
    }

    let material_lines = draft
        .paint_items
        .iter()
        .map(|item| MaterialLine {
            description: format!("{} {} - {}", item.product, item.finish, item.area),
            area: item.area.clone(),
            product: item.product.clone(),
            finish: item.finish.clone(),
            color: item.color.clone(),
            coats: item.coats,
            gallons: item.gallons,
            unit_price: item.price_per_gallon,
            line_total: item.line_total().round_dp(2),
        })
        .collect();

    let labor_line = labor_cost(draft, defaults).and_then(|line_total| {
        Some(LaborLine {
            painters: draft.number_of_painters?,
            days: draft.estimated_days?,
            hours_per_day: draft.hours_per_day.unwrap_or(defaults.hours_per_day),
            hourly_rate: draft.hourly_rate.unwrap_or(defaults.hourly_rate),
            line_total,
        })
    });

    let add_on_lines = draft
        .add_ons
        .iter()
        .map(|add_on| AddOnLine {
            description: add_on.description.clone(),
            hours: add_on.hours,
            hourly_rate: add_on.hourly_rate,
            line_total: add_on.cost().round_dp(2),
        })
        .collect();

    let mut scope = draft.scope_of_work.clone();
    scope.extend(draft.colors.iter().map(|assignment| {
        if assignment.color.eq_ignore_ascii_case(&assignment.sw_code) {
            format!("Color ({}): {}", assignment.area, assignment.sw_code)
        } else {
            format!("Color ({}): {} {}", assignment.area, assignment.color, assignment.sw_code)
        }
    }));

    Ok(EstimatePayload {
        project_name: project_name(draft),
        customer: EstimateCustomer {
            name: customer_name.to_string(),
            address: draft.address.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
        },
        project_type: draft.project_type.map(|kind| kind.as_str().to_string()),
        material_lines,
        labor_line,
        add_on_lines,
        scope,
        markup_pct: draft.markup_pct.unwrap_or(defaults.markup_pct),
        tax_rate_pct: draft.tax_rate_pct.unwrap_or(defaults.tax_rate_pct),
        estimate_total: draft.estimate_total,
    })
}
