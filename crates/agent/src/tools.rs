//! Operations the dialogue transport may call mid-conversation.
//!
//! Tools never write to a draft. They return a [`ToolEffect`] describing the
//! field updates they want, and the voice session applies it through the
//! draft lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use paintvox_core::domain::business::BusinessDefaults;
use paintvox_core::domain::draft::{Draft, DraftUpdate};
use paintvox_db::CustomerDirectory;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::warn;

pub const LOOKUP_CUSTOMER: &str = "lookup_customer";
pub const GET_BUSINESS_CONFIG: &str = "get_business_config";

#[derive(Clone, Debug, PartialEq)]
pub enum ToolEffect {
    None,
    UpdateActiveDraft(DraftUpdate),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub payload: Value,
    pub effect: ToolEffect,
}

impl ToolOutput {
    pub fn reply(payload: Value) -> Self {
        Self { payload, effect: ToolEffect::None }
    }

    pub fn with_update(payload: Value, update: DraftUpdate) -> Self {
        let effect =
            if update.is_empty() { ToolEffect::None } else { ToolEffect::UpdateActiveDraft(update) };
        Self { payload, effect }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    /// `active` is the current draft snapshot, when one is active.
    async fn execute(&self, input: Value, active: Option<&Draft>) -> ToolOutput;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Unknown tool names yield an error payload rather than a failure.
    pub async fn call(&self, name: &str, input: Value, active: Option<&Draft>) -> ToolOutput {
        match self.tools.get(name) {
            Some(tool) => tool.execute(input, active).await,
            None => ToolOutput::reply(json!({
                "error": format!("unknown tool `{name}`"),
                "available_tools": self.names(),
            })),
        }
    }
}

pub struct CustomerLookupTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CustomerLookupTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CustomerLookupTool {
    fn name(&self) -> &'static str {
        LOOKUP_CUSTOMER
    }

    async fn execute(&self, input: Value, _active: Option<&Draft>) -> ToolOutput {
        let name = input.get("name").and_then(Value::as_str).map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return ToolOutput::reply(json!({
                "found": false,
                "message": "No customer name was given. Ask the user for the customer's name.",
            }));
        }

        let customer = match self.directory.find_by_name(name).await {
            Ok(customer) => customer,
            Err(error) => {
                warn!(
                    event_name = "voice.tool.lookup_failed",
                    tool = LOOKUP_CUSTOMER,
                    error = %error,
                    "customer directory lookup failed"
                );
                None
            }
        };

        let Some(customer) = customer else {
            return ToolOutput::reply(json!({
                "found": false,
                "message": format!(
                    "No existing customer matches \"{name}\". Treat them as a new customer and \
                     collect their address and phone number."
                ),
            }));
        };

        let message = match &customer.address {
            Some(address) => format!("Found {} at {address}.", customer.name),
            None => format!("Found {}.", customer.name),
        };
        let payload = json!({
            "found": true,
            "message": message,
            "customer": {
                "name": customer.name,
                "address": customer.address,
                "phone": customer.phone,
                "email": customer.email,
            },
        });
        let update = DraftUpdate {
            customer_name: Some(customer.name),
            address: customer.address,
            phone: customer.phone,
            email: customer.email,
            ..DraftUpdate::default()
        };
        ToolOutput::with_update(payload, update)
    }
}

#[async_trait]
pub trait BusinessConfigSource: Send + Sync {
    async fn business_defaults(&self) -> Result<BusinessDefaults>;
}

/// Defaults fixed at startup from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticBusinessConfig {
    defaults: BusinessDefaults,
}

impl StaticBusinessConfig {
    pub fn new(defaults: BusinessDefaults) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl BusinessConfigSource for StaticBusinessConfig {
    async fn business_defaults(&self) -> Result<BusinessDefaults> {
        Ok(self.defaults.clone())
    }
}

pub struct BusinessConfigTool {
    source: Arc<dyn BusinessConfigSource>,
}

impl BusinessConfigTool {
    pub fn new(source: Arc<dyn BusinessConfigSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for BusinessConfigTool {
    fn name(&self) -> &'static str {
        GET_BUSINESS_CONFIG
    }

    async fn execute(&self, _input: Value, active: Option<&Draft>) -> ToolOutput {
        let defaults = match self.source.business_defaults().await {
            Ok(defaults) => defaults,
            Err(error) => {
                warn!(
                    event_name = "voice.tool.business_config_failed",
                    tool = GET_BUSINESS_CONFIG,
                    error = %error,
                    "business configuration unavailable"
                );
                return ToolOutput::reply(json!({
                    "found": false,
                    "message": "Business defaults are unavailable. Ask the user for their hourly rate.",
                }));
            }
        };

        let payload = json!({
            "found": true,
            "hourly_rate": number(defaults.hourly_rate),
            "markup_pct": number(defaults.markup_pct),
            "tax_rate_pct": number(defaults.tax_rate_pct),
            "hours_per_day": number(defaults.hours_per_day),
            "message": format!(
                "The default hourly rate is ${:.2}. Do not ask the user for their hourly rate; \
                 use this default unless they state a different one.",
                defaults.hourly_rate
            ),
        });

        // Pre-fill only gaps in an active draft.
        let Some(draft) = active else {
            return ToolOutput::reply(payload);
        };
        let update = DraftUpdate {
            hourly_rate: draft.hourly_rate.is_none().then_some(defaults.hourly_rate),
            markup_pct: draft.markup_pct.is_none().then_some(defaults.markup_pct),
            tax_rate_pct: draft.tax_rate_pct.is_none().then_some(defaults.tax_rate_pct),
            hours_per_day: draft.hours_per_day.is_none().then_some(defaults.hours_per_day),
            ..DraftUpdate::default()
        };
        ToolOutput::with_update(payload, update)
    }
}

fn number(value: Decimal) -> Value {
    value.to_f64().map(Value::from).unwrap_or_else(|| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use paintvox_core::domain::business::BusinessDefaults;
    use paintvox_core::domain::customer::{Customer, CustomerId};
    use paintvox_core::domain::draft::Draft;
    use paintvox_db::repositories::InMemoryCustomerDirectory;

    use super::{
        BusinessConfigSource, BusinessConfigTool, CustomerLookupTool, StaticBusinessConfig, Tool,
        ToolEffect, ToolRegistry,
    };

    fn directory() -> Arc<InMemoryCustomerDirectory> {
        Arc::new(InMemoryCustomerDirectory::with_customers(vec![Customer {
            id: CustomerId::generate(),
            name: "John Smith".to_string(),
            address: Some("42 Elm Street".to_string()),
            phone: Some("(555) 123-4567".to_string()),
            email: None,
        }]))
    }

    #[tokio::test]
    async fn lookup_hit_returns_fields_and_an_update() {
        let tool = CustomerLookupTool::new(directory());
        let output = tool.execute(json!({"name": "john smith"}), None).await;

        assert_eq!(output.payload["found"], json!(true));
        assert_eq!(output.payload["message"], json!("Found John Smith at 42 Elm Street."));
        let ToolEffect::UpdateActiveDraft(update) = output.effect else {
            panic!("expected a draft update");
        };
        assert_eq!(update.customer_name.as_deref(), Some("John Smith"));
        assert_eq!(update.address.as_deref(), Some("42 Elm Street"));
        assert_eq!(update.email, None);
    }

    #[tokio::test]
    async fn lookup_miss_is_soft() {
        let tool = CustomerLookupTool::new(directory());
        let output = tool.execute(json!({"name": "Priya Patel"}), None).await;

        assert_eq!(output.payload["found"], json!(false));
        assert!(output.payload["message"].as_str().unwrap_or_default().contains("Priya Patel"));
        assert_eq!(output.effect, ToolEffect::None);
    }

    #[tokio::test]
    async fn empty_names_skip_the_lookup() {
        let tool = CustomerLookupTool::new(directory());
        for input in [json!({"name": "  "}), json!({})] {
            let output = tool.execute(input, None).await;
            assert_eq!(output.payload["found"], json!(false));
            assert_eq!(output.effect, ToolEffect::None);
        }
    }

    #[tokio::test]
    async fn business_config_fills_only_unset_fields() {
        let tool = BusinessConfigTool::new(Arc::new(StaticBusinessConfig::default()));
        let mut draft = Draft::new(Utc::now());
        draft.hourly_rate = Some(Decimal::from(80));

        let output = tool.execute(json!({}), Some(&draft)).await;
        assert_eq!(output.payload["hourly_rate"], json!(65.0));
        assert!(output.payload["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Do not ask the user for their hourly rate"));

        let ToolEffect::UpdateActiveDraft(update) = output.effect else {
            panic!("expected a draft update");
        };
        assert_eq!(update.hourly_rate, None);
        assert_eq!(update.markup_pct, Some(Decimal::from(20)));
        assert_eq!(update.tax_rate_pct, Some(Decimal::from(8)));
        assert_eq!(update.hours_per_day, Some(Decimal::from(8)));
    }

    #[tokio::test]
    async fn business_config_without_active_draft_has_no_effect() {
        let tool = BusinessConfigTool::new(Arc::new(StaticBusinessConfig::default()));
        let output = tool.execute(json!({}), None).await;
        assert_eq!(output.payload["found"], json!(true));
        assert_eq!(output.effect, ToolEffect::None);
    }

    struct BrokenSource;

    #[async_trait]
    impl BusinessConfigSource for BrokenSource {
        async fn business_defaults(&self) -> anyhow::Result<BusinessDefaults> {
            Err(anyhow!("settings store offline"))
        }
    }

    #[tokio::test]
    async fn business_config_failure_is_soft() {
        let tool = BusinessConfigTool::new(Arc::new(BrokenSource));
        let output = tool.execute(json!({}), Some(&Draft::new(Utc::now()))).await;
        assert_eq!(output.payload["found"], json!(false));
        assert_eq!(output.effect, ToolEffect::None);
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = ToolRegistry::default();
        registry.register(CustomerLookupTool::new(directory()));
        registry.register(BusinessConfigTool::new(Arc::new(StaticBusinessConfig::default())));
        assert_eq!(registry.names(), vec!["get_business_config", "lookup_customer"]);

        let output = registry.call("lookup_customer", json!({"name": "Smith"}), None).await;
        assert_eq!(output.payload["found"], json!(true));

        let unknown = registry.call("send_sms", json!({}), None).await;
        assert_eq!(unknown.payload["error"], json!("unknown tool `send_sms`"));
    }
}
