use super::{CorrectionRule, EligibilityRule, RuleParams, SizeRule, correction, eligibility, size};
use crate::domain::discount::{DiscountId, RuleSpec, normalize_rule_name};
use crate::error::{Result, ShippingError};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Eligibility,
    Size,
    Correction,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Eligibility => "eligibility",
            RuleKind::Size => "size",
            RuleKind::Correction => "correction",
        };
        f.write_str(name)
    }
}

pub type Constructor<R> = Box<dyn Fn(RuleParams<'_>) -> Result<Box<R>> + Send + Sync>;

/// Name to constructor tables, one per rule kind.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Default)]
pub struct RuleRegistry {
    eligibility: HashMap<String, Constructor<dyn EligibilityRule>>,
    size: HashMap<String, Constructor<dyn SizeRule>>,
    correction: HashMap<String, Constructor<dyn CorrectionRule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule variant.
    pub fn with_builtin_rules() -> Result<Self> {
        let mut registry = Self::new();
        eligibility::register(&mut registry)?;
        size::register(&mut registry)?;
        correction::register(&mut registry)?;
        Ok(registry)
    }

    pub fn register_eligibility<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(RuleParams<'_>) -> Result<Box<dyn EligibilityRule>> + Send + Sync + 'static,
    {
        insert(&mut self.eligibility, RuleKind::Eligibility, name, Box::new(constructor))
    }

    pub fn register_size<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(RuleParams<'_>) -> Result<Box<dyn SizeRule>> + Send + Sync + 'static,
    {
        insert(&mut self.size, RuleKind::Size, name, Box::new(constructor))
    }

    pub fn register_correction<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(RuleParams<'_>) -> Result<Box<dyn CorrectionRule>> + Send + Sync + 'static,
    {
        insert(&mut self.correction, RuleKind::Correction, name, Box::new(constructor))
    }

    pub fn resolve_eligibility(
        &self,
        spec: &RuleSpec,
        discount_id: DiscountId,
    ) -> Result<Box<dyn EligibilityRule>> {
        resolve(&self.eligibility, RuleKind::Eligibility, spec, discount_id)
    }

    pub fn resolve_size(&self, spec: &RuleSpec, discount_id: DiscountId) -> Result<Box<dyn SizeRule>> {
        resolve(&self.size, RuleKind::Size, spec, discount_id)
    }

    pub fn resolve_correction(
        &self,
        spec: &RuleSpec,
        discount_id: DiscountId,
    ) -> Result<Box<dyn CorrectionRule>> {
        resolve(&self.correction, RuleKind::Correction, spec, discount_id)
    }

    pub fn contains(&self, kind: RuleKind, name: &str) -> bool {
        let name = normalize_rule_name(name);
        match kind {
            RuleKind::Eligibility => self.eligibility.contains_key(&name),
            RuleKind::Size => self.size.contains_key(&name),
            RuleKind::Correction => self.correction.contains_key(&name),
        }
    }
}

fn insert<R: ?Sized>(
    table: &mut HashMap<String, Constructor<R>>,
    kind: RuleKind,
    name: &str,
    constructor: Constructor<R>,
) -> Result<()> {
    let name = normalize_rule_name(name);
    if table.contains_key(&name) {
        return Err(ShippingError::Configuration(format!(
            "{kind} rule '{name}' is already registered"
        )));
    }
    tracing::debug!(%kind, rule = %name, "registering rule");
    table.insert(name, constructor);
    Ok(())
}

fn resolve<R: ?Sized>(
    table: &HashMap<String, Constructor<R>>,
    kind: RuleKind,
    spec: &RuleSpec,
    discount_id: DiscountId,
) -> Result<Box<R>> {
    let name = normalize_rule_name(&spec.name);
    let constructor = table.get(&name).ok_or_else(|| {
        ShippingError::Configuration(format!("unknown {kind} rule '{name}'"))
    })?;
    constructor(RuleParams {
        discount_id,
        values: &spec.params,
    })
}
