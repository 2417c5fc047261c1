use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FinError, Result};
use crate::hashing::{salted_hash, DigestAlgorithm, Salt};

const BUILTIN_RULES: &str = include_str!("../data/default_rules.json");

/// Counterparty identifiers with a known meaning, grouped the way the hash matcher checks them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashTables {
    #[serde(default)]
    pub not_a_company: BTreeSet<String>,
    #[serde(default)]
    pub paypal: BTreeSet<String>,
    #[serde(default)]
    pub tikkie: BTreeSet<String>,
    #[serde(default)]
    pub community: BTreeSet<String>,
    #[serde(default)]
    pub companies: BTreeMap<String, String>,
}

/// Free-text rule: any of `patterns` found in the lower-cased description maps to `company`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionRule {
    pub patterns: Vec<String>,
    pub company: String,
}

impl DescriptionRule {
    #[cfg(test)]
    pub fn new(patterns: &[&str], company: &str) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
            company: company.to_string(),
        }
    }

    /// `text` must already be lower-cased.
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

/// Company allow-lists per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryLists {
    #[serde(default)]
    pub salary: BTreeSet<String>,
    #[serde(default)]
    pub fastfood: BTreeSet<String>,
    #[serde(default)]
    pub groceries: BTreeSet<String>,
    #[serde(default)]
    pub restaurant: BTreeSet<String>,
    #[serde(default)]
    pub investment: BTreeSet<String>,
}

/// Every lookup table the pipeline consults. Loaded once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Entries keyed by salted hash, valid for one salt only.
    #[serde(default)]
    pub hash_tables: HashTables,
    /// Entries keyed by raw account identifier. Hashed with the run salt by `salted`.
    #[serde(default)]
    pub accounts: HashTables,
    #[serde(default = "default_community_name")]
    pub community_name: String,
    #[serde(default)]
    pub person_to_person: BTreeSet<String>,
    #[serde(default)]
    pub description_rules: Vec<DescriptionRule>,
    /// Also run the description rules over the notifications text. Off by default:
    /// the loose fallbacks ("ns", "ah") hit far more often in that longer text.
    #[serde(default)]
    pub match_notifications: bool,
    #[serde(default)]
    pub categories: CategoryLists,
    #[serde(default)]
    pub savings_labels: BTreeSet<String>,
}

fn default_community_name() -> String {
    "Stichting AmstellandBibliotheken".to_string()
}

impl RuleSet {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RULES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(json)?;
        rules.normalized().validate()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let rules = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            description_rules = rules.description_rules.len(),
            known_hashes = rules.known_hash_count(),
            "loaded rules"
        );
        Ok(rules)
    }

    /// Rules from `path` when it exists, otherwise the built-in defaults.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "rules file missing, using built-in rules");
            Self::builtin()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn known_hash_count(&self) -> usize {
        self.hash_tables.entry_count()
    }

    pub fn known_account_count(&self) -> usize {
        self.accounts.entry_count()
    }

    /// Copy with every raw account re-keyed by its salted hash and merged into
    /// `hash_tables`. The copy holds no raw identifiers.
    pub fn salted(&self, salt: &Salt, digest: DigestAlgorithm) -> Result<Self> {
        let hash_all = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter()
                .filter_map(|v| salted_hash(Some(v.as_str()), salt, digest))
                .collect()
        };
        let mut rules = self.clone();
        let a = &self.accounts;
        let t = &mut rules.hash_tables;
        t.not_a_company.extend(hash_all(&a.not_a_company));
        t.paypal.extend(hash_all(&a.paypal));
        t.tikkie.extend(hash_all(&a.tikkie));
        t.community.extend(hash_all(&a.community));
        for (account, company) in &a.companies {
            if let Some(hash) = salted_hash(Some(account.as_str()), salt, digest) {
                t.companies.entry(hash).or_insert_with(|| company.clone());
            }
        }
        rules.accounts = HashTables::default();
        debug!(known_hashes = rules.known_hash_count(), "salted account tables");
        rules.validate()
    }

    fn normalized(mut self) -> Self {
        for rule in &mut self.description_rules {
            for p in &mut rule.patterns {
                *p = p.to_lowercase();
            }
        }
        self
    }

    fn validate(self) -> Result<Self> {
        for (i, rule) in self.description_rules.iter().enumerate() {
            if rule.company.trim().is_empty() {
                return Err(FinError::Settings(format!("description rule {i} has no company")));
            }
            if rule.patterns.is_empty() || rule.patterns.iter().any(|p| p.is_empty()) {
                return Err(FinError::Settings(format!(
                    "description rule {i} ({}) has an empty pattern",
                    rule.company
                )));
            }
        }

        self.hash_tables.check_disjoint("hash_tables")?;
        self.accounts.check_disjoint("accounts")?;
        Ok(self)
    }
}

impl HashTables {
    pub fn entry_count(&self) -> usize {
        self.not_a_company.len()
            + self.paypal.len()
            + self.tikkie.len()
            + self.community.len()
            + self.companies.len()
    }

    /// An identifier may belong to at most one group.
    fn check_disjoint(&self, section: &str) -> Result<()> {
        let sets = [
            ("not_a_company", &self.not_a_company),
            ("paypal", &self.paypal),
            ("tikkie", &self.tikkie),
            ("community", &self.community),
        ];
        for (i, (name_a, a)) in sets.iter().enumerate() {
            for (name_b, b) in &sets[i + 1..] {
                if let Some(v) = a.intersection(b).next() {
                    return Err(FinError::Settings(format!(
                        "{section}: {v} is listed in both {name_a} and {name_b}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_parse() {
        let rules = RuleSet::builtin().unwrap();
        assert!(!rules.description_rules.is_empty());
        assert!(rules.categories.salary.contains("Achmea"));
        assert!(rules.savings_labels.contains("Oranje Spaarrekening"));
        assert_eq!(rules.known_hash_count(), 0);
        assert_eq!(rules.known_account_count(), 25);
        assert_eq!(
            rules.accounts.companies.get("NL43RABO0192303139").map(String::as_str),
            Some("Achmea")
        );
    }

    #[test]
    fn test_salted_rekeys_accounts_by_hash() {
        let salt = Salt::new("s1");
        let rules = RuleSet::builtin().unwrap().salted(&salt, DigestAlgorithm::Sha256).unwrap();
        assert_eq!(rules.known_account_count(), 0);
        let achmea = salted_hash(Some("NL43RABO0192303139"), &salt, DigestAlgorithm::Sha256).unwrap();
        assert_eq!(rules.hash_tables.companies.get(&achmea).map(String::as_str), Some("Achmea"));
        let tikkie = salted_hash(Some("NL61ABNA0811086593"), &salt, DigestAlgorithm::Sha256).unwrap();
        assert!(rules.hash_tables.tikkie.contains(&tikkie));
        assert!(!rules.to_json().unwrap().contains("NL43RABO0192303139"));
    }

    #[test]
    fn test_salted_keeps_existing_hash_entries() {
        let salt = Salt::new("s1");
        let mut rules = RuleSet::builtin().unwrap();
        rules.hash_tables.companies.insert("prehashed".to_string(), "Shop".to_string());
        let salted = rules.salted(&salt, DigestAlgorithm::Sha256).unwrap();
        assert_eq!(salted.hash_tables.companies.get("prehashed").map(String::as_str), Some("Shop"));
        assert_eq!(salted.known_hash_count(), 25 + 1);
    }

    #[test]
    fn test_overlapping_account_groups_rejected() {
        let json = r#"{"accounts": {"paypal": ["NL01"], "community": ["NL01"]}}"#;
        let err = RuleSet::from_json(json).unwrap_err();
        assert!(err.to_string().contains("accounts"));
    }

    #[test]
    fn test_builtin_specific_rules_precede_fallbacks() {
        let rules = RuleSet::builtin().unwrap();
        let pos = |pattern: &str| {
            rules
                .description_rules
                .iter()
                .position(|r| r.patterns.iter().any(|p| p == pattern))
                .unwrap()
        };
        assert!(pos("mcdonald") < pos("mcd"));
        assert!(pos("mc donald's") < pos("mcd"));
        assert!(pos("albert heijn") < pos("ah"));
        assert!(pos("klm") < pos("ns"));
        assert_eq!(pos("ns"), rules.description_rules.len() - 1);
    }

    #[test]
    fn test_patterns_are_lowercased_on_load() {
        let json = r#"{"description_rules": [{"patterns": ["KLM Royal"], "company": "KLM"}]}"#;
        let rules = RuleSet::from_json(json).unwrap();
        assert_eq!(rules.description_rules[0].patterns, vec!["klm royal"]);
        assert_eq!(rules.community_name, "Stichting AmstellandBibliotheken");
    }

    #[test]
    fn test_overlapping_hash_sets_rejected() {
        let json = r#"{"hash_tables": {"paypal": ["abc"], "tikkie": ["abc"]}}"#;
        let err = RuleSet::from_json(json).unwrap_err();
        assert!(err.to_string().contains("paypal"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let json = r#"{"description_rules": [{"patterns": [""], "company": "X"}]}"#;
        assert!(RuleSet::from_json(json).is_err());
    }

    #[test]
    fn test_load_or_builtin_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::load_or_builtin(&dir.path().join("missing.json")).unwrap();
        assert_eq!(rules, RuleSet::builtin().unwrap());
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let rules = RuleSet::builtin().unwrap();
        std::fs::write(&path, rules.to_json().unwrap()).unwrap();
        assert_eq!(RuleSet::load(&path).unwrap(), rules);
    }
}
