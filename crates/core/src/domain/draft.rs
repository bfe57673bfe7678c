use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DraftId(pub String);

impl DraftId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Interior,
    Exterior,
    Both,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interior => "interior",
            Self::Exterior => "exterior",
            Self::Both => "both",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Interior => "Interior",
            Self::Exterior => "Exterior",
            Self::Both => "Interior & Exterior",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    User,
    Agent,
}

impl std::str::FromStr for SpeakerRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "customer" => Ok(Self::User),
            "agent" | "assistant" => Ok(Self::Agent),
            other => Err(format!("unsupported speaker role `{other}` (expected user|agent)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: SpeakerRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintItem {
    pub area: String,
    pub product: String,
    pub gallons: Decimal,
    pub finish: String,
    pub color: Option<String>,
    pub coats: u32,
    pub price_per_gallon: Decimal,
}

impl PaintItem {
    pub fn line_total(&self) -> Decimal {
        self.gallons * self.price_per_gallon
    }

    /// Two items describe the same purchase when gallons, product and area agree.
    pub fn same_line(&self, other: &PaintItem) -> bool {
        self.gallons == other.gallons
            && self.product.eq_ignore_ascii_case(&other.product)
            && self.area.eq_ignore_ascii_case(&other.area)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    pub area: String,
    pub color: String,
    pub sw_code: String,
}

impl ColorAssignment {
    pub fn duplicates(&self, other: &ColorAssignment) -> bool {
        self.sw_code.eq_ignore_ascii_case(&other.sw_code)
            || self.color.eq_ignore_ascii_case(&other.color)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub description: String,
    pub hours: Decimal,
    pub hourly_rate: Decimal,
    /// Rate was not stated for this task and tracks the draft's hourly rate.
    #[serde(default)]
    pub rate_follows_draft: bool,
}

impl AddOn {
    pub fn cost(&self) -> Decimal {
        self.hours * self.hourly_rate
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    CustomerName,
    Address,
    Phone,
    Email,
    ProjectType,
    Areas,
    NumberOfPainters,
    EstimatedDays,
    HoursPerDay,
    HourlyRate,
    PaintItems,
    Colors,
    ScopeOfWork,
    AddOns,
    MarkupPct,
    TaxRatePct,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::ProjectType => "project_type",
            Self::Areas => "areas",
            Self::NumberOfPainters => "number_of_painters",
            Self::EstimatedDays => "estimated_days",
            Self::HoursPerDay => "hours_per_day",
            Self::HourlyRate => "hourly_rate",
            Self::PaintItems => "paint_items",
            Self::Colors => "colors",
            Self::ScopeOfWork => "scope_of_work",
            Self::AddOns => "add_ons",
            Self::MarkupPct => "markup_pct",
            Self::TaxRatePct => "tax_rate_pct",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomerName => "Customer name",
            Self::Address => "Property address",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::ProjectType => "Project type",
            Self::Areas => "Areas",
            Self::NumberOfPainters => "Number of painters",
            Self::EstimatedDays => "Estimated days",
            Self::HoursPerDay => "Hours per day",
            Self::HourlyRate => "Hourly rate",
            Self::PaintItems => "Paint items",
            Self::Colors => "Colors",
            Self::ScopeOfWork => "Scope of work",
            Self::AddOns => "Add-ons",
            Self::MarkupPct => "Material markup",
            Self::TaxRatePct => "Tax rate",
        }
    }
}

/// The in-progress estimate collected over a voice session.
///
/// Derived figures (`labor_cost`, `material_subtotal`, `estimate_total`) are
/// owned by [`crate::pricing`] and must only change through a recalculation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    pub project_type: Option<ProjectType>,
    pub areas: Vec<String>,

    pub number_of_painters: Option<u32>,
    pub estimated_days: Option<Decimal>,
    pub hours_per_day: Option<Decimal>,
    pub hourly_rate: Option<Decimal>,
    pub labor_cost: Option<Decimal>,

    pub paint_items: Vec<PaintItem>,
    pub material_subtotal: Decimal,

    pub colors: Vec<ColorAssignment>,
    pub scope_of_work: Vec<String>,
    pub add_ons: Vec<AddOn>,

    pub markup_pct: Option<Decimal>,
    pub tax_rate_pct: Option<Decimal>,
    pub estimate_total: Decimal,

    pub conversation: Vec<ConversationEntry>,

    /// Conversation length observed when each scalar field was last written.
    /// Extraction may only replace a populated value with evidence from a later turn.
    #[serde(default)]
    pub evidence: BTreeMap<DraftField, usize>,

    pub is_complete: bool,
    pub final_estimate_id: Option<String>,
}

impl Draft {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: DraftId::generate(),
            created_at: now,
            updated_at: now,
            customer_name: None,
            address: None,
            phone: None,
            email: None,
            project_type: None,
            areas: Vec::new(),
            number_of_painters: None,
            estimated_days: None,
            hours_per_day: None,
            hourly_rate: None,
            labor_cost: None,
            paint_items: Vec::new(),
            material_subtotal: Decimal::ZERO,
            colors: Vec::new(),
            scope_of_work: Vec::new(),
            add_ons: Vec::new(),
            markup_pct: None,
            tax_rate_pct: None,
            estimate_total: Decimal::ZERO,
            conversation: Vec::new(),
            evidence: BTreeMap::new(),
            is_complete: false,
            final_estimate_id: None,
        }
    }

    pub fn push_turn(&mut self, role: SpeakerRole, message: impl Into<String>, at: DateTime<Utc>) {
        self.conversation.push(ConversationEntry { role, message: message.into(), timestamp: at });
    }

    pub fn evidence_mark(&self, field: DraftField) -> usize {
        self.evidence.get(&field).copied().unwrap_or(0)
    }

    /// Merges a partial update and returns the fields whose value changed.
    ///
    /// Absent fields are left untouched; the merge never clears a value.
    pub fn apply(&mut self, update: DraftUpdate) -> Vec<DraftField> {
        let DraftUpdate {
            customer_name,
            address,
            phone,
            email,
            project_type,
            areas,
            number_of_painters,
            estimated_days,
            hours_per_day,
            hourly_rate,
            paint_items,
            colors,
            scope_of_work,
            add_ons,
            markup_pct,
            tax_rate_pct,
            observed_turns,
        } = update;

        let mut merge = Merge {
            observed_turns,
            default_mark: self.conversation.len(),
            evidence: &mut self.evidence,
            changed: Vec::new(),
        };

        merge.scalar(DraftField::CustomerName, &mut self.customer_name, customer_name);
        merge.scalar(DraftField::Address, &mut self.address, address);
        merge.scalar(DraftField::Phone, &mut self.phone, phone);
        merge.scalar(DraftField::Email, &mut self.email, email);
        merge.scalar(DraftField::ProjectType, &mut self.project_type, project_type);
        merge.list(DraftField::Areas, &mut self.areas, areas);
        merge.scalar(DraftField::NumberOfPainters, &mut self.number_of_painters, number_of_painters);
        merge.scalar(DraftField::EstimatedDays, &mut self.estimated_days, estimated_days);
        merge.scalar(DraftField::HoursPerDay, &mut self.hours_per_day, hours_per_day);
        merge.scalar(DraftField::HourlyRate, &mut self.hourly_rate, hourly_rate);
        merge.list(DraftField::PaintItems, &mut self.paint_items, paint_items);
        merge.list(DraftField::Colors, &mut self.colors, colors);
        merge.list(DraftField::ScopeOfWork, &mut self.scope_of_work, scope_of_work);
        merge.list(DraftField::AddOns, &mut self.add_ons, add_ons);
        merge.scalar(DraftField::MarkupPct, &mut self.markup_pct, markup_pct);
        merge.scalar(DraftField::TaxRatePct, &mut self.tax_rate_pct, tax_rate_pct);

        merge.changed
    }
}

struct Merge<'a> {
    observed_turns: BTreeMap<DraftField, usize>,
    default_mark: usize,
    evidence: &'a mut BTreeMap<DraftField, usize>,
    changed: Vec<DraftField>,
}

impl Merge<'_> {
    fn scalar<T: PartialEq>(&mut self, field: DraftField, slot: &mut Option<T>, value: Option<T>) {
        let Some(value) = value else {
            return;
        };
        let mark = self.observed_turns.get(&field).copied().unwrap_or(self.default_mark);
        self.evidence.insert(field, mark);
        if slot.as_ref() != Some(&value) {
            *slot = Some(value);
            self.changed.push(field);
        }
    }

    fn list<T: PartialEq>(&mut self, field: DraftField, slot: &mut Vec<T>, value: Option<Vec<T>>) {
        let Some(value) = value else {
            return;
        };
        if *slot != value {
            *slot = value;
            self.changed.push(field);
        }
    }
}

/// A partial set of field values to merge into a [`Draft`].
///
/// List fields carry the complete replacement list. Scalar fields may carry the
/// conversation length at which their evidence was observed; fields without an
/// entry are stamped with the draft's current conversation length.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_painters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint_items: Option<Vec<PaintItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<ColorAssignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_of_work: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<Vec<AddOn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub observed_turns: BTreeMap<DraftField, usize>,
}

impl DraftUpdate {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn fields(&self) -> Vec<DraftField> {
        let mut fields = Vec::new();
        let mut flag = |present: bool, field: DraftField| {
            if present {
                fields.push(field);
            }
        };
        flag(self.customer_name.is_some(), DraftField::CustomerName);
        flag(self.address.is_some(), DraftField::Address);
        flag(self.phone.is_some(), DraftField::Phone);
        flag(self.email.is_some(), DraftField::Email);
        flag(self.project_type.is_some(), DraftField::ProjectType);
        flag(self.areas.is_some(), DraftField::Areas);
        flag(self.number_of_painters.is_some(), DraftField::NumberOfPainters);
        flag(self.estimated_days.is_some(), DraftField::EstimatedDays);
        flag(self.hours_per_day.is_some(), DraftField::HoursPerDay);
        flag(self.hourly_rate.is_some(), DraftField::HourlyRate);
        flag(self.paint_items.is_some(), DraftField::PaintItems);
        flag(self.colors.is_some(), DraftField::Colors);
        flag(self.scope_of_work.is_some(), DraftField::ScopeOfWork);
        flag(self.add_ons.is_some(), DraftField::AddOns);
        flag(self.markup_pct.is_some(), DraftField::MarkupPct);
        flag(self.tax_rate_pct.is_some(), DraftField::TaxRatePct);
        fields
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{Draft, DraftField, DraftUpdate, ProjectType, SpeakerRole};

    #[test]
    fn apply_reports_only_changed_fields() {
        let mut draft = Draft::new(Utc::now());
        let update = DraftUpdate {
            customer_name: Some("John Smith".to_string()),
            number_of_painters: Some(2),
            ..DraftUpdate::default()
        };

        let changed = draft.apply(update.clone());
        assert_eq!(changed, vec![DraftField::CustomerName, DraftField::NumberOfPainters]);

        let changed_again = draft.apply(update);
        assert!(changed_again.is_empty(), "re-applying the same update must be a no-op");
    }

    #[test]
    fn absent_fields_never_clear_values() {
        let mut draft = Draft::new(Utc::now());
        draft.apply(DraftUpdate {
            project_type: Some(ProjectType::Exterior),
            hourly_rate: Some(Decimal::from(65)),
            ..DraftUpdate::default()
        });

        draft.apply(DraftUpdate {
            customer_name: Some("Ana Lopez".to_string()),
            ..DraftUpdate::default()
        });

        assert_eq!(draft.project_type, Some(ProjectType::Exterior));
        assert_eq!(draft.hourly_rate, Some(Decimal::from(65)));
    }

    #[test]
    fn evidence_defaults_to_current_conversation_length() {
        let mut draft = Draft::new(Utc::now());
        draft.push_turn(SpeakerRole::User, "hello", Utc::now());
        draft.push_turn(SpeakerRole::Agent, "hi there", Utc::now());

        draft.apply(DraftUpdate {
            hourly_rate: Some(Decimal::from(70)),
            ..DraftUpdate::default()
        });

        assert_eq!(draft.evidence_mark(DraftField::HourlyRate), 2);
        assert_eq!(draft.evidence_mark(DraftField::CustomerName), 0);
    }

    #[test]
    fn speaker_role_parses_transport_names() {
        assert_eq!("user".parse::<SpeakerRole>(), Ok(SpeakerRole::User));
        assert_eq!("Agent".parse::<SpeakerRole>(), Ok(SpeakerRole::Agent));
        assert!("narrator".parse::<SpeakerRole>().is_err());
    }
}
