//! Turns a spoken transcript into draft field updates.
//!
//! Every pass re-reads the whole conversation, customer turns only, so the
//! agent's questions never fill a field. Scalar fields resolve to the most
//! recent turn that matched any rule (rule order breaks ties inside a turn).
//! List fields accumulate on top of what the draft already holds.

pub mod addons;
pub mod colors;
pub mod customer;
pub mod labor;
pub mod materials;
pub mod numbers;
pub mod rules;
pub mod scope;

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::business::BusinessDefaults;
use crate::domain::draft::{
    AddOn, ColorAssignment, ConversationEntry, Draft, DraftField, DraftUpdate, PaintItem,
    ProjectType,
};
use rules::{RuleHit, Turn};

/// Everything the rule tables found in a transcript, before comparing with a draft.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedFields {
    pub customer_name: Option<RuleHit<String>>,
    pub address: Option<RuleHit<String>>,
    pub phone: Option<RuleHit<String>>,
    pub email: Option<RuleHit<String>>,
    pub project_type: Option<RuleHit<ProjectType>>,
    pub number_of_painters: Option<RuleHit<u32>>,
    pub estimated_days: Option<RuleHit<Decimal>>,
    pub hours_per_day: Option<RuleHit<Decimal>>,
    pub hourly_rate: Option<RuleHit<Decimal>>,
    pub areas: Vec<String>,
    pub paint_items: Vec<PaintItem>,
    pub colors: Vec<ColorAssignment>,
    pub scope_of_work: Vec<String>,
    pub add_ons: Vec<addons::AddOnMention>,
}

#[derive(Clone, Debug, Default)]
pub struct FieldExtractor {
    defaults: BusinessDefaults,
}

impl FieldExtractor {
    pub fn new(defaults: BusinessDefaults) -> Self {
        Self { defaults }
    }

    pub fn scan(&self, conversation: &[ConversationEntry]) -> ExtractedFields {
        let turns = Turn::customer_turns(conversation);
        ExtractedFields {
            customer_name: customer::name_rules().latest(&turns),
            address: customer::address_rules().latest(&turns),
            phone: customer::phone_rules().latest(&turns),
            email: customer::email_rules().latest(&turns),
            project_type: customer::project_type(&turns),
            number_of_painters: labor::crew_rules().latest(&turns),
            estimated_days: labor::days_rules().latest(&turns),
            hours_per_day: labor::hours_rules().latest(&turns),
            hourly_rate: labor::rate_rules().latest(&turns),
            areas: scope::areas(&turns),
            paint_items: materials::paint_items(&turns),
            colors: colors::color_assignments(&turns),
            scope_of_work: scope::prep_tasks(&turns),
            add_ons: addons::add_on_mentions(&turns),
        }
    }

    /// Partial update carrying only what differs from `draft`.
    ///
    /// A populated scalar is replaced only by evidence newer than the value it
    /// holds, so re-running on an unchanged transcript yields an empty update.
    pub fn extract(&self, conversation: &[ConversationEntry], draft: &Draft) -> DraftUpdate {
        let found = self.scan(conversation);
        let mut evidence = Evidence { draft, observed: BTreeMap::new() };
        let mut update = DraftUpdate {
            customer_name: evidence.newer(
                DraftField::CustomerName,
                &draft.customer_name,
                found.customer_name,
            ),
            address: evidence.newer(DraftField::Address, &draft.address, found.address),
            phone: evidence.newer(DraftField::Phone, &draft.phone, found.phone),
            email: evidence.newer(DraftField::Email, &draft.email, found.email),
            project_type: evidence.newer(
                DraftField::ProjectType,
                &draft.project_type,
                found.project_type,
            ),
            number_of_painters: evidence.newer(
                DraftField::NumberOfPainters,
                &draft.number_of_painters,
                found.number_of_painters,
            ),
            estimated_days: evidence.newer(
                DraftField::EstimatedDays,
                &draft.estimated_days,
                found.estimated_days,
            ),
            hours_per_day: evidence.newer(
                DraftField::HoursPerDay,
                &draft.hours_per_day,
                found.hours_per_day,
            ),
            hourly_rate: evidence.newer(
                DraftField::HourlyRate,
                &draft.hourly_rate,
                found.hourly_rate,
            ),
            ..DraftUpdate::default()
        };
        update.observed_turns = evidence.observed;

        let mut known_areas = draft.areas.clone();
        if found.areas.iter().any(|area| scope::is_area(area)) {
            known_areas.retain(|area| !scope::is_room_count(area));
        }
        update.areas = accumulate_onto(&draft.areas, known_areas, found.areas, |a, b| {
            a.eq_ignore_ascii_case(b)
        });
        update.colors = accumulate(&draft.colors, found.colors, ColorAssignment::duplicates);
        let paint_items = accumulate(&draft.paint_items, found.paint_items, PaintItem::same_line)
            .unwrap_or_else(|| draft.paint_items.clone());
        let paint_items =
            link_colors(paint_items, update.colors.as_deref().unwrap_or(&draft.colors));
        update.paint_items = (paint_items != draft.paint_items).then_some(paint_items);

        let prep = accumulate(&draft.scope_of_work, found.scope_of_work, |a, b| {
            a.eq_ignore_ascii_case(b)
        });
        let scope_of_work =
            scope::collapse_synonyms(prep.unwrap_or_else(|| draft.scope_of_work.clone()));
        update.scope_of_work = (scope_of_work != draft.scope_of_work).then_some(scope_of_work);

        let rate = update.hourly_rate.or(draft.hourly_rate).unwrap_or(self.defaults.hourly_rate);
        update.add_ons = merge_add_ons(&draft.add_ons, found.add_ons, rate);

        update
    }
}

/// Uncoloured paint items take the colour assigned to their area.
fn link_colors(mut items: Vec<PaintItem>, colors: &[ColorAssignment]) -> Vec<PaintItem> {
    for item in items.iter_mut().filter(|item| item.color.is_none()) {
        item.color = colors
            .iter()
            .find(|assignment| assignment.area.eq_ignore_ascii_case(&item.area))
            .map(|assignment| assignment.color.clone());
    }
    items
}

/// Stated hours replace earlier ones for the same task, and rates that were
/// never stated follow `rate`.
fn merge_add_ons(
    existing: &[AddOn],
    found: Vec<addons::AddOnMention>,
    rate: Decimal,
) -> Option<Vec<AddOn>> {
    let mut merged = existing.to_vec();
    for add_on in merged.iter_mut().filter(|add_on| add_on.rate_follows_draft) {
        add_on.hourly_rate = rate;
    }
    for mention in found {
        match merged
            .iter_mut()
            .find(|add_on| add_on.description.eq_ignore_ascii_case(mention.description))
        {
            Some(add_on) => add_on.hours = mention.hours,
            None => merged.push(AddOn {
                description: mention.description.to_string(),
                hours: mention.hours,
                hourly_rate: rate,
                rate_follows_draft: true,
            }),
        }
    }
    (merged != existing).then_some(merged)
}

struct Evidence<'a> {
    draft: &'a Draft,
    observed: BTreeMap<DraftField, usize>,
}

impl Evidence<'_> {
    fn newer<T: PartialEq>(
        &mut self,
        field: DraftField,
        current: &Option<T>,
        hit: Option<RuleHit<T>>,
    ) -> Option<T> {
        let hit = hit?;
        let accept = match current {
            None => true,
            Some(value) => {
                *value != hit.value && hit.observed_at() > self.draft.evidence_mark(field)
            }
        };
        if !accept {
            return None;
        }
        self.observed.insert(field, hit.observed_at());
        Some(hit.value)
    }
}

/// Existing entries followed by unseen found ones; `None` when nothing is new.
fn accumulate<T: Clone + PartialEq>(
    existing: &[T],
    found: Vec<T>,
    same: impl Fn(&T, &T) -> bool,
) -> Option<Vec<T>> {
    accumulate_onto(existing, existing.to_vec(), found, same)
}

/// Like [`accumulate`], starting from `base` instead of the stored list.
fn accumulate_onto<T: Clone + PartialEq>(
    existing: &[T],
    mut base: Vec<T>,
    found: Vec<T>,
    same: impl Fn(&T, &T) -> bool,
) -> Option<Vec<T>> {
    for candidate in found {
        if !base.iter().any(|entry| same(entry, &candidate)) {
            base.push(candidate);
        }
    }
    (base != existing).then_some(base)
}
