use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::classifier::{expense_category, Classifier};
use crate::error::Result;
use crate::hashing::{row_fingerprint, salted_hash, DigestAlgorithm, Salt};
use crate::models::{CategoryFlags, Direction, EnrichedRecord, TransactionRecord};
use crate::resolver::MerchantResolver;
use crate::rules::RuleSet;

fn mandate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Mandate ID:\s+([A-Z0-9]+)(?:\s|$)").expect("valid mandate regex"))
}

/// Pull the SEPA mandate reference out of the notifications text.
pub fn extract_mandate_id(notifications: &str) -> Option<String> {
    mandate_regex()
        .captures(notifications)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Everything a run needs besides the rows themselves.
pub struct Pipeline {
    salt: Salt,
    digest: DigestAlgorithm,
    resolver: MerchantResolver,
    classifier: Classifier,
}

impl Pipeline {
    /// Account tables in `rules` are hashed with `salt` here; nothing downstream sees a raw identifier.
    pub fn new(rules: &RuleSet, salt: Salt, digest: DigestAlgorithm) -> Result<Self> {
        let rules = rules.salted(&salt, digest)?;
        Ok(Self {
            resolver: MerchantResolver::standard(&rules),
            classifier: Classifier::new(&rules),
            salt,
            digest,
        })
    }

    /// Stage 1: identity, anonymization and direction. Company and flags stay empty.
    pub fn prepare(&self, record: TransactionRecord) -> EnrichedRecord {
        let fingerprint = row_fingerprint(&record.field_values());
        let counterparty_hash = salted_hash(record.counterparty.as_deref(), &self.salt, self.digest);
        let direction = Direction::from_debit_credit(&record.debit_credit);
        let mandate_id = extract_mandate_id(&record.notifications);
        EnrichedRecord {
            record,
            fingerprint,
            counterparty_hash,
            direction,
            mandate_id,
            company_name: None,
            flags: CategoryFlags::default(),
            expense_category: None,
        }
    }

    /// Stage 2: merchant resolution.
    pub fn resolve(&self, mut rec: EnrichedRecord) -> EnrichedRecord {
        rec.company_name = self.resolver.resolve(&rec);
        rec
    }

    /// Stage 3: category flags, on the final company and direction.
    pub fn classify(&self, mut rec: EnrichedRecord) -> EnrichedRecord {
        rec.flags = self.classifier.classify(&rec);
        rec.expense_category = expense_category(&rec.flags, rec.direction);
        rec
    }

    pub fn enrich(&self, record: TransactionRecord) -> EnrichedRecord {
        self.classify(self.resolve(self.prepare(record)))
    }

    pub fn run(&self, records: Vec<TransactionRecord>) -> Vec<EnrichedRecord> {
        debug!(rows = records.len(), "enriching rows");
        let enriched: Vec<EnrichedRecord> = records.into_iter().map(|r| self.enrich(r)).collect();
        let stats = Coverage::of(&enriched);
        info!(
            rows = stats.rows,
            resolved = stats.resolved,
            percent = stats.percent_resolved(),
            "enriched rows"
        );
        enriched
    }
}

/// How many rows ended up with a company name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub rows: usize,
    pub resolved: usize,
}

impl Coverage {
    pub fn of(records: &[EnrichedRecord]) -> Self {
        let resolved = records
            .iter()
            .filter(|r| r.company_name.as_deref().is_some_and(|n| !n.is_empty()))
            .count();
        Self {
            rows: records.len(),
            resolved,
        }
    }

    pub fn percent_resolved(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.resolved as f64 / self.rows as f64 * 100.0
    }
}

/// Unresolved rows grouped by counterparty, largest group first.
pub fn unresolved_counterparties(records: &[EnrichedRecord]) -> Vec<(String, usize)> {
    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for rec in records.iter().filter(|r| r.company_name.is_none()) {
        let key = rec.record.counterparty.clone().unwrap_or_default();
        *counts.entry(key).or_default() += 1;
    }
    let mut grouped: Vec<(String, usize)> = counts.into_iter().collect();
    grouped.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    grouped
}
