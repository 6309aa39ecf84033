use super::carrier::{deserialize_optional_code, normalize_code};
use super::discount::DiscountId;
use super::money::Amount;
use crate::error::{Result, ShippingError};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A validated transaction that has not been priced yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessedTransaction {
    pub date: NaiveDate,
    pub carrier: String,
    pub package_size: String,
}

impl UnprocessedTransaction {
    pub fn new(date: NaiveDate, carrier: &str, package_size: &str) -> Result<Self> {
        let carrier = normalize_code(carrier);
        let package_size = normalize_code(package_size);
        if carrier.is_empty() || package_size.is_empty() {
            return Err(ShippingError::invalid_request());
        }
        Ok(Self {
            date,
            carrier,
            package_size,
        })
    }
}

/// A transaction together with the discount that was applied to it, if any.
///
/// Built once per processed transaction and handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    #[serde(flatten)]
    pub transaction: UnprocessedTransaction,
    pub discount_id: Option<DiscountId>,
    pub discount: Option<Amount>,
}

impl ProcessedTransaction {
    pub fn new(
        transaction: UnprocessedTransaction,
        discount_id: Option<DiscountId>,
        discount: Option<Amount>,
    ) -> Self {
        Self {
            transaction,
            discount_id,
            discount,
        }
    }
}

/// Inclusive date range; an open end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub const ALL: Self = Self {
        start: None,
        end: None,
    };

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// First through last day of `date`'s calendar month.
    pub fn calendar_month(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self::between(first, last)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| start <= date) && self.end.is_none_or(|end| date <= end)
    }
}

/// Equality constraints on the fields of a transaction. Unset fields match
/// anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionAttributes {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub carrier: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub package_size: Option<String>,
}

impl TransactionAttributes {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.carrier.is_none() && self.package_size.is_none()
    }

    pub fn matches(&self, transaction: &UnprocessedTransaction) -> bool {
        self.date.is_none_or(|date| date == transaction.date)
            && self
                .carrier
                .as_ref()
                .is_none_or(|carrier| *carrier == transaction.carrier)
            && self
                .package_size
                .as_ref()
                .is_none_or(|size| *size == transaction.package_size)
    }
}

/// Selects persisted transactions for history aggregates.
///
/// Deserialized through [`FilterFields`] because serde cannot reject unknown
/// keys next to a flattened field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "FilterFields")]
pub struct TransactionFilter {
    #[serde(flatten)]
    pub attributes: TransactionAttributes,
    #[serde(default)]
    pub discount_id: Option<DiscountId>,
}

impl TransactionFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn discount(discount_id: DiscountId) -> Self {
        Self {
            attributes: TransactionAttributes::default(),
            discount_id: Some(discount_id),
        }
    }

    pub fn matches(&self, processed: &ProcessedTransaction) -> bool {
        self.attributes.matches(&processed.transaction)
            && self
                .discount_id
                .is_none_or(|id| processed.discount_id == Some(id))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterFields {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    carrier: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    package_size: Option<String>,
    #[serde(default)]
    discount_id: Option<DiscountId>,
}

impl From<FilterFields> for TransactionFilter {
    fn from(fields: FilterFields) -> Self {
        Self {
            attributes: TransactionAttributes {
                date: fields.date,
                carrier: fields.carrier,
                package_size: fields.package_size,
            },
            discount_id: fields.discount_id,
        }
    }
}

impl From<TransactionAttributes> for TransactionFilter {
    fn from(attributes: TransactionAttributes) -> Self {
        Self {
            attributes,
            discount_id: None,
        }
    }
}
