use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type DiscountId = u32;

/// Names one rule variant and the parameters to build it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(deserialize_with = "deserialize_rule_name")]
    pub name: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

impl RuleSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_rule_name(name),
            params: empty_params(),
        }
    }

    pub fn with_params(name: &str, params: Value) -> Self {
        Self {
            name: normalize_rule_name(name),
            params,
        }
    }
}

pub fn normalize_rule_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn deserialize_rule_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_rule_name(&raw))
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

/// Declarative description of one discount rule, as found in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRuleDefinition {
    pub discount_id: DiscountId,
    pub size_rule: RuleSpec,
    #[serde(default)]
    pub eligibility_rules: Vec<RuleSpec>,
    #[serde(default, alias = "size_correction_rule")]
    pub correction_rule: Option<RuleSpec>,
}

impl DiscountRuleDefinition {
    pub fn new(discount_id: DiscountId, size_rule: RuleSpec) -> Self {
        Self {
            discount_id,
            size_rule,
            eligibility_rules: Vec::new(),
            correction_rule: None,
        }
    }

    pub fn with_eligibility(mut self, rule: RuleSpec) -> Self {
        self.eligibility_rules.push(rule);
        self
    }

    pub fn with_correction(mut self, rule: RuleSpec) -> Self {
        self.correction_rule = Some(rule);
        self
    }
}

/// Outcome of one executor that produced a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicableDiscount {
    pub discount_id: DiscountId,
    pub amount: Decimal,
}

/// Picks the largest discount; on a tie the earliest candidate wins.
pub fn select_largest<I>(candidates: I) -> Option<ApplicableDiscount>
where
    I: IntoIterator<Item = ApplicableDiscount>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.amount >= candidate.amount => Some(current),
        _ => Some(candidate),
    })
}
