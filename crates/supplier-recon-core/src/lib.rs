//! Domain logic for supplier lead-time reconciliation.
//!
//! This crate carries the pure state-engine pieces: supplier identity
//! normalization, order-delay aggregation with urgency classification,
//! the qualification record schema with its upsert invariant, and the
//! metrics-driven unified view builder. Persistence lives in
//! `supplier-recon-store-json`; this crate performs no I/O.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ReconError {
    #[error("malformed order extract: {0}")]
    MalformedInput(String),
    #[error("invalid qualification record: {0}")]
    Validation(String),
}

/// Canonical matching key derived from a supplier display name.
///
/// Two display names that differ only by surrounding whitespace or letter
/// case normalize to the same identity. Case folding is the simple Unicode
/// lowercase mapping; locale-aware folding (e.g. Turkish dotless i) is a
/// documented limitation, not a bug. The identity is derived on demand and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SupplierIdentity(String);

impl SupplierIdentity {
    /// Derives the canonical identity for a display name. Missing input
    /// maps to the canonical empty identity.
    #[must_use]
    pub fn normalize(name: Option<&str>) -> Self {
        Self(name.unwrap_or_default().trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for SupplierIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Low,
    Medium,
    High,
    Unclassified,
}

impl UrgencyTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unclassified => "unclassified",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "unclassified" => Some(Self::Unclassified),
            _ => None,
        }
    }

    /// Classifies a mean lead time. Boundaries are inclusive on the lower
    /// tier: exactly 3.0 days is `Low`, exactly 7.0 days is `Medium`.
    #[must_use]
    pub fn classify(mean_lead_days: Option<f64>) -> Self {
        match mean_lead_days {
            None => Self::Unclassified,
            Some(mean) if mean <= 3.0 => Self::Low,
            Some(mean) if mean <= 7.0 => Self::Medium,
            Some(_) => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    #[default]
    Pending,
    Approved,
    Conditional,
    Rejected,
}

impl QualificationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Conditional => "conditional",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "conditional" => Some(Self::Conditional),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityAnswer {
    Yes,
    No,
    Partial,
}

impl CapabilityAnswer {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Partial => "partial",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    Prepaid,
    Net30,
    Net60,
    LetterOfCredit,
}

impl PaymentTerms {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepaid => "prepaid",
            Self::Net30 => "net30",
            Self::Net60 => "net60",
            Self::LetterOfCredit => "letter_of_credit",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "prepaid" => Some(Self::Prepaid),
            "net30" => Some(Self::Net30),
            "net60" => Some(Self::Net60),
            "letter_of_credit" => Some(Self::LetterOfCredit),
            _ => None,
        }
    }
}

/// One shipment event as handed over by the tabular ingest collaborator.
///
/// Fields are already renamed to the three logical names; a cell the
/// collaborator could not supply arrives as `None`. Rows are ephemeral and
/// consumed only during aggregation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRow {
    pub supplier: Option<String>,
    pub acknowledged_at: Option<String>,
    pub ready_at: Option<String>,
}

/// Per-supplier delay metrics for the most recent import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierMetric {
    pub supplier_name: String,
    pub order_count: u32,
    pub mean_lead_days: Option<f64>,
    pub urgency: UrgencyTier,
}

impl SupplierMetric {
    #[must_use]
    pub fn identity(&self) -> SupplierIdentity {
        SupplierIdentity::normalize(Some(&self.supplier_name))
    }
}

/// Fixed logistics-capability answer schema.
///
/// The source system kept these as an open label-to-text map; the fixed
/// field set makes the closed answer vocabulary explicit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityAnswers {
    pub customs_handling: Option<CapabilityAnswer>,
    pub shipment_tracking: Option<CapabilityAnswer>,
    pub express_shipping: Option<CapabilityAnswer>,
    pub packaging_compliance: Option<CapabilityAnswer>,
    pub dedicated_contact: Option<CapabilityAnswer>,
}

impl CapabilityAnswers {
    /// The all-unanswered grid, synthesized for suppliers without a stored
    /// qualification.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Human-entered qualification assessment for one supplier identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualificationRecord {
    pub supplier_name: String,
    pub contact: String,
    pub country: String,
    pub answers: CapabilityAnswers,
    pub declared_standard_lead_days: Option<u32>,
    pub declared_express_lead_days: Option<u32>,
    pub payment_terms: Option<PaymentTerms>,
    pub status: QualificationStatus,
    pub comment: String,
}

impl QualificationRecord {
    #[must_use]
    pub fn identity(&self) -> SupplierIdentity {
        SupplierIdentity::normalize(Some(&self.supplier_name))
    }

    /// Validates a record before it enters the store.
    ///
    /// # Errors
    /// Returns [`ReconError::Validation`] when the supplier name normalizes
    /// to the empty identity.
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.identity().is_empty() {
            return Err(ReconError::Validation(
                "supplier name MUST normalize to a non-empty identity".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one aggregation run.
///
/// `skipped_rows` counts rows dropped by the silent row policy so callers
/// can surface data-quality warnings; `negative_delay_samples` counts
/// ready-before-acknowledgement delays, which are retained as valid samples
/// rather than discarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateReport {
    pub metrics: Vec<SupplierMetric>,
    pub skipped_rows: usize,
    pub negative_delay_samples: usize,
}

/// One row of the reconciliation view: a supplier metric joined with its
/// qualification, or with the synthesized pending default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnifiedRow {
    pub supplier_name: String,
    pub order_count: u32,
    pub mean_lead_days: Option<f64>,
    pub urgency: UrgencyTier,
    pub qualified: bool,
    pub status: QualificationStatus,
    pub contact: String,
    pub country: String,
    pub answers: CapabilityAnswers,
    pub declared_standard_lead_days: Option<u32>,
    pub declared_express_lead_days: Option<u32>,
    pub payment_terms: Option<PaymentTerms>,
    pub comment: String,
}

struct DelayGroup {
    display_name: String,
    row_count: u32,
    delay_sum_days: i64,
    delay_samples: u32,
}

/// Aggregates raw order rows into per-supplier delay metrics.
///
/// Row policy: a row whose supplier normalizes to the empty identity, or
/// whose present date value fails to parse, is dropped silently and counted
/// in `skipped_rows`. A row whose date cells are simply absent still counts
/// toward its supplier but contributes no delay sample. Negative delays are
/// valid samples. Metrics are sorted by descending order count, ties broken
/// by ascending display name; downstream display depends on that order.
///
/// # Errors
/// Returns [`ReconError::MalformedInput`] when a non-empty batch carries no
/// supplier field at all, or no date fields at all. Row-level issues never
/// fail the batch.
pub fn aggregate(rows: &[OrderRow]) -> Result<AggregateReport, ReconError> {
    if !rows.is_empty() {
        if rows.iter().all(|row| row.supplier.is_none()) {
            return Err(ReconError::MalformedInput(
                "supplier field is absent from every row".to_string(),
            ));
        }
        if rows
            .iter()
            .all(|row| row.acknowledged_at.is_none() && row.ready_at.is_none())
        {
            return Err(ReconError::MalformedInput(
                "acknowledgement and ready dates are absent from every row".to_string(),
            ));
        }
    }

    let mut groups: BTreeMap<SupplierIdentity, DelayGroup> = BTreeMap::new();
    let mut skipped_rows = 0_usize;
    let mut negative_delay_samples = 0_usize;

    for row in rows {
        let identity = SupplierIdentity::normalize(row.supplier.as_deref());
        if identity.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let delay_days = match row_delay_days(row) {
            RowDelay::Sample(days) => Some(days),
            RowDelay::NoSample => None,
            RowDelay::Unparseable => {
                skipped_rows += 1;
                continue;
            }
        };

        let display_name = row
            .supplier
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string();
        let group = groups.entry(identity).or_insert_with(|| DelayGroup {
            display_name: display_name.clone(),
            row_count: 0,
            delay_sum_days: 0,
            delay_samples: 0,
        });
        // Last-seen casing wins for display.
        group.display_name = display_name;
        group.row_count += 1;
        if let Some(days) = delay_days {
            group.delay_sum_days += days;
            group.delay_samples += 1;
            if days < 0 {
                negative_delay_samples += 1;
            }
        }
    }

    let mut metrics: Vec<SupplierMetric> = groups
        .into_values()
        .map(|group| {
            let mean_lead_days = mean_of(group.delay_sum_days, group.delay_samples);
            SupplierMetric {
                supplier_name: group.display_name,
                order_count: group.row_count,
                urgency: UrgencyTier::classify(mean_lead_days),
                mean_lead_days,
            }
        })
        .collect();

    metrics.sort_by(|a, b| {
        b.order_count
            .cmp(&a.order_count)
            .then_with(|| a.supplier_name.cmp(&b.supplier_name))
    });

    Ok(AggregateReport {
        metrics,
        skipped_rows,
        negative_delay_samples,
    })
}

enum RowDelay {
    Sample(i64),
    NoSample,
    Unparseable,
}

fn row_delay_days(row: &OrderRow) -> RowDelay {
    let acknowledged = match parse_present_date(row.acknowledged_at.as_deref()) {
        Ok(value) => value,
        Err(()) => return RowDelay::Unparseable,
    };
    let ready = match parse_present_date(row.ready_at.as_deref()) {
        Ok(value) => value,
        Err(()) => return RowDelay::Unparseable,
    };

    match (acknowledged, ready) {
        (Some(acknowledged), Some(ready)) => RowDelay::Sample((ready - acknowledged).whole_days()),
        _ => RowDelay::NoSample,
    }
}

// Absent cells are tolerated; present-but-unparseable values poison the row.
fn parse_present_date(value: Option<&str>) -> Result<Option<Date>, ()> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match parse_order_date(raw) {
        Some(date) => Ok(Some(date)),
        None => Err(()),
    }
}

/// Parses an order date in `YYYY-MM-DD` form.
#[must_use]
pub fn parse_order_date(value: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), &format).ok()
}

#[allow(clippy::cast_precision_loss)]
fn mean_of(sum_days: i64, samples: u32) -> Option<f64> {
    if samples == 0 {
        return None;
    }
    let mean = sum_days as f64 / f64::from(samples);
    Some(round_one_decimal(mean))
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Inserts or replaces a qualification record by normalized identity.
///
/// Post-condition: exactly one record carries the new record's identity,
/// and its field values are the new record's values.
pub fn upsert_qualification(
    records: &mut Vec<QualificationRecord>,
    record: QualificationRecord,
) {
    let identity = record.identity();
    match records
        .iter_mut()
        .find(|existing| existing.identity() == identity)
    {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Joins metrics with qualification records into the unified view.
///
/// The join is metrics-driven: every metric produces exactly one row, in
/// metric order, and suppliers with only a qualification record are
/// excluded by policy (only suppliers present in the latest import are
/// currently relevant). Unmatched metrics synthesize a pending status with
/// empty answers.
#[must_use]
pub fn build_view(
    metrics: &[SupplierMetric],
    qualifications: &[QualificationRecord],
) -> Vec<UnifiedRow> {
    let by_identity: BTreeMap<SupplierIdentity, &QualificationRecord> = qualifications
        .iter()
        .map(|record| (record.identity(), record))
        .collect();

    metrics
        .iter()
        .map(|metric| match by_identity.get(&metric.identity()) {
            Some(record) => UnifiedRow {
                supplier_name: metric.supplier_name.clone(),
                order_count: metric.order_count,
                mean_lead_days: metric.mean_lead_days,
                urgency: metric.urgency,
                qualified: true,
                status: record.status,
                contact: record.contact.clone(),
                country: record.country.clone(),
                answers: record.answers.clone(),
                declared_standard_lead_days: record.declared_standard_lead_days,
                declared_express_lead_days: record.declared_express_lead_days,
                payment_terms: record.payment_terms,
                comment: record.comment.clone(),
            },
            None => UnifiedRow {
                supplier_name: metric.supplier_name.clone(),
                order_count: metric.order_count,
                mean_lead_days: metric.mean_lead_days,
                urgency: metric.urgency,
                qualified: false,
                status: QualificationStatus::Pending,
                contact: String::new(),
                country: String::new(),
                answers: CapabilityAnswers::empty(),
                declared_standard_lead_days: None,
                declared_express_lead_days: None,
                payment_terms: None,
                comment: String::new(),
            },
        })
        .collect()
}
