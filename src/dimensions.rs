use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::debug;

use crate::error::{FinError, Result};
use crate::models::{CompanyDim, EnrichedRecord, Fact, StarSchema, TransactionInfoDim};

/// Distinct keys in first-occurrence order.
fn distinct<K: Clone + Eq + Hash>(keys: impl Iterator<Item = K>) -> Vec<K> {
    let mut seen = HashSet::new();
    keys.filter(|k| seen.insert(k.clone())).collect()
}

pub fn build_company_dimension(records: &[EnrichedRecord]) -> Vec<CompanyDim> {
    distinct(records.iter().map(EnrichedRecord::company_key))
        .into_iter()
        .enumerate()
        .map(|(i, key)| CompanyDim {
            company_key: i + 1,
            key,
        })
        .collect()
}

pub fn build_transaction_info_dimension(records: &[EnrichedRecord]) -> Vec<TransactionInfoDim> {
    distinct(records.iter().map(EnrichedRecord::transaction_info_key))
        .into_iter()
        .enumerate()
        .map(|(i, key)| TransactionInfoDim {
            transaction_info_key: i + 1,
            key,
        })
        .collect()
}

/// Natural key → surrogate key. A natural key listed twice is an integrity failure.
fn index<'a, K: Eq + Hash>(
    dimension: &str,
    rows: impl Iterator<Item = (&'a K, usize)>,
) -> Result<HashMap<&'a K, usize>>
where
    K: 'a,
{
    let mut idx = HashMap::new();
    for (key, surrogate) in rows {
        if let Some(previous) = idx.insert(key, surrogate) {
            return Err(FinError::Integrity(format!(
                "{dimension} dimension has duplicate natural key (keys {previous} and {surrogate})"
            )));
        }
    }
    Ok(idx)
}

fn lookup<K: Eq + Hash>(
    dimension: &str,
    idx: &HashMap<&K, usize>,
    key: &K,
    rec: &EnrichedRecord,
) -> Result<usize> {
    idx.get(key).copied().ok_or_else(|| {
        FinError::Integrity(format!(
            "row {} has no matching {dimension} dimension row",
            rec.fingerprint
        ))
    })
}

/// Join every record to both dimensions. Each record must hit exactly one row in each.
pub fn build_facts(
    records: &[EnrichedRecord],
    companies: &[CompanyDim],
    transaction_info: &[TransactionInfoDim],
) -> Result<Vec<Fact>> {
    let company_idx = index(
        "company",
        companies.iter().map(|d| (&d.key, d.company_key)),
    )?;
    let info_idx = index(
        "transaction-info",
        transaction_info.iter().map(|d| (&d.key, d.transaction_info_key)),
    )?;

    let mut facts = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let company_key = lookup("company", &company_idx, &rec.company_key(), rec)?;
        let transaction_info_key =
            lookup("transaction-info", &info_idx, &rec.transaction_info_key(), rec)?;
        facts.push(Fact {
            fact_key: i + 1,
            company_key,
            transaction_info_key,
            fingerprint: rec.fingerprint.clone(),
            date: rec.record.date,
            amount: rec.signed_amount(),
        });
    }

    if facts.len() != records.len() {
        return Err(FinError::Integrity(format!(
            "fact table has {} rows for {} input rows",
            facts.len(),
            records.len()
        )));
    }
    Ok(facts)
}

pub fn build_star_schema(records: &[EnrichedRecord]) -> Result<StarSchema> {
    let companies = build_company_dimension(records);
    let transaction_info = build_transaction_info_dimension(records);
    let facts = build_facts(records, &companies, &transaction_info)?;
    debug!(
        companies = companies.len(),
        transaction_info = transaction_info.len(),
        facts = facts.len(),
        "built star schema"
    );
    Ok(StarSchema {
        companies,
        transaction_info,
        facts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{test_pipeline, txn};

    fn sample() -> Vec<EnrichedRecord> {
        test_pipeline().run(vec![
            txn(Some("NL86INGB0002445588"), "Belastingdienst aanslag", "Debit", -150.0),
            txn(None, "Jumbo Utrecht", "Debit", -12.0),
            txn(None, "Jumbo Utrecht", "Debit", -8.5),
            txn(None, "Vapiano Rotterdam", "Debit", -30.0),
            txn(Some("NL99BANK0000000001"), "Qwerty", "Debit", -1.0),
            txn(Some("NL43RABO0192303139"), "Salaris", "Credit", 2500.0),
            txn(None, "Jumbo Amsterdam", "Debit", -3.0),
        ])
    }

    #[test]
    fn test_company_dimension_distinct_in_first_occurrence_order() {
        let dim = build_company_dimension(&sample());
        let names: Vec<Option<&str>> = dim.iter().map(|d| d.key.company_name.as_deref()).collect();
        assert_eq!(
            names,
            vec![Some("Belastingdienst"), Some("Jumbo"), Some("Vapiano"), None, Some("Achmea")]
        );
        let keys: Vec<usize> = dim.iter().map(|d| d.company_key).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
        assert!(dim[2].key.is_restaurant);
        assert!(!dim[3].key.is_restaurant);
    }

    #[test]
    fn test_transaction_info_dimension_dedups() {
        let dim = build_transaction_info_dimension(&sample());
        // The two "Jumbo Utrecht" rows collapse into one.
        assert_eq!(dim.len(), 6);
        assert_eq!(dim[1].key.description, "Jumbo Utrecht");
        assert_eq!(dim.last().unwrap().transaction_info_key, 6);
    }

    #[test]
    fn test_every_fact_resolves_to_one_dimension_row() {
        let records = sample();
        let schema = build_star_schema(&records).unwrap();
        assert_eq!(schema.facts.len(), records.len());
        for (fact, rec) in schema.facts.iter().zip(&records) {
            let companies: Vec<_> = schema
                .companies
                .iter()
                .filter(|d| d.company_key == fact.company_key)
                .collect();
            assert_eq!(companies.len(), 1);
            assert_eq!(companies[0].key, rec.company_key());
            let infos: Vec<_> = schema
                .transaction_info
                .iter()
                .filter(|d| d.transaction_info_key == fact.transaction_info_key)
                .collect();
            assert_eq!(infos.len(), 1);
            assert_eq!(infos[0].key, rec.transaction_info_key());
        }
        assert_eq!(schema.facts[1].company_key, schema.facts[2].company_key);
        assert_eq!(schema.facts[1].transaction_info_key, schema.facts[2].transaction_info_key);
    }

    #[test]
    fn test_fact_amount_and_keys() {
        let schema = build_star_schema(&sample()).unwrap();
        assert_eq!(schema.facts[0].fact_key, 1);
        assert_eq!(schema.facts[0].amount, -150.0);
        assert_eq!(schema.facts[5].amount, 2500.0);
    }

    #[test]
    fn test_missing_dimension_row_is_fatal() {
        let records = sample();
        let mut companies = build_company_dimension(&records);
        companies.retain(|d| d.key.company_name.as_deref() != Some("Jumbo"));
        let info = build_transaction_info_dimension(&records);
        let err = build_facts(&records, &companies, &info).unwrap_err();
        assert!(matches!(err, FinError::Integrity(_)));
        assert!(err.to_string().contains("no matching company"));
    }

    #[test]
    fn test_duplicate_dimension_row_is_fatal() {
        let records = sample();
        let companies = build_company_dimension(&records);
        let mut info = build_transaction_info_dimension(&records);
        let mut dup = info[0].clone();
        dup.transaction_info_key = 99;
        info.push(dup);
        let err = build_facts(&records, &companies, &info).unwrap_err();
        assert!(err.to_string().contains("duplicate natural key"));
    }

    #[test]
    fn test_empty_input_gives_empty_schema() {
        let schema = build_star_schema(&[]).unwrap();
        assert!(schema.companies.is_empty());
        assert!(schema.transaction_info.is_empty());
        assert!(schema.facts.is_empty());
    }

    #[test]
    fn test_star_schema_is_idempotent() {
        assert_eq!(build_star_schema(&sample()).unwrap(), build_star_schema(&sample()).unwrap());
    }
}
