use crate::models::EnrichedRecord;
use crate::rules::{DescriptionRule, HashTables, RuleSet};

pub const NOT_A_COMPANY: &str = "Not a company";
pub const PAYPAL: &str = "PayPal";
pub const TIKKIE: &str = "Tikkie";

/// Record field a matcher is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CounterpartyHash,
    Description,
    Notifications,
}

impl Field {
    pub fn value<'a>(&self, rec: &'a EnrichedRecord) -> Option<&'a str> {
        match self {
            Self::CounterpartyHash => rec.counterparty_hash.as_deref(),
            Self::Description => Some(rec.record.description.as_str()),
            Self::Notifications => Some(rec.record.notifications.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Matchers (enum dispatch instead of trait objects)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Matcher {
    HashTable {
        tables: HashTables,
        community_name: String,
    },
    FreeText {
        rules: Vec<DescriptionRule>,
    },
}

impl Matcher {
    pub fn hash_table(rules: &RuleSet) -> Self {
        Self::HashTable {
            tables: rules.hash_tables.clone(),
            community_name: rules.community_name.clone(),
        }
    }

    pub fn free_text(rules: &RuleSet) -> Self {
        Self::FreeText {
            rules: rules.description_rules.clone(),
        }
    }

    pub fn apply(&self, value: Option<&str>) -> Option<String> {
        let value = value?;
        match self {
            Self::HashTable { tables, community_name } => {
                match_hash(tables, community_name, value)
            }
            Self::FreeText { rules } => match_text(rules, value),
        }
    }
}

fn match_hash(tables: &HashTables, community_name: &str, hash: &str) -> Option<String> {
    let groups: [(&std::collections::BTreeSet<String>, &str); 4] = [
        (&tables.not_a_company, NOT_A_COMPANY),
        (&tables.paypal, PAYPAL),
        (&tables.tikkie, TIKKIE),
        (&tables.community, community_name),
    ];
    groups
        .iter()
        .find(|(set, _)| set.contains(hash))
        .map(|(_, name)| name.to_string())
        .or_else(|| tables.companies.get(hash).cloned())
}

fn match_text(rules: &[DescriptionRule], text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|r| r.matches(&lowered))
        .map(|r| r.company.clone())
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// First-match-wins chain of matchers. The order is the caller's policy.
#[derive(Debug, Clone)]
pub struct MerchantResolver {
    chain: Vec<(Matcher, Field)>,
}

impl MerchantResolver {
    pub fn new(chain: Vec<(Matcher, Field)>) -> Self {
        Self { chain }
    }

    /// Exact hash lookups first, description substrings second, then the
    /// notifications text when the rules ask for it.
    pub fn standard(rules: &RuleSet) -> Self {
        let mut chain = vec![
            (Matcher::hash_table(rules), Field::CounterpartyHash),
            (Matcher::free_text(rules), Field::Description),
        ];
        if rules.match_notifications {
            chain.push((Matcher::free_text(rules), Field::Notifications));
        }
        Self::new(chain)
    }

    pub fn resolve(&self, rec: &EnrichedRecord) -> Option<String> {
        self.chain
            .iter()
            .filter_map(|(matcher, field)| matcher.apply(field.value(rec)))
            .find(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{salted_hash, DigestAlgorithm, Salt};
    use crate::models::{CategoryFlags, Direction, TransactionRecord};

    fn record(description: &str, counterparty_hash: Option<&str>) -> EnrichedRecord {
        EnrichedRecord {
            record: TransactionRecord {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                description: description.to_string(),
                account: "NL52INGB0003610006".to_string(),
                counterparty: None,
                code: "BA".to_string(),
                debit_credit: "Debit".to_string(),
                amount: -10.0,
                transaction_type: "Payment terminal".to_string(),
                notifications: String::new(),
                balance: 100.0,
                tag: None,
                source_cells: Vec::new(),
            },
            fingerprint: String::new(),
            counterparty_hash: counterparty_hash.map(str::to_string),
            direction: Direction::Outgoing,
            mandate_id: None,
            company_name: None,
            flags: CategoryFlags::default(),
            expense_category: None,
        }
    }

    fn tables() -> RuleSet {
        let mut rules = RuleSet::builtin().unwrap();
        let t = &mut rules.hash_tables;
        t.not_a_company.insert("h-own".to_string());
        t.paypal.insert("h-paypal".to_string());
        t.tikkie.insert("h-tikkie".to_string());
        t.community.insert("h-library".to_string());
        t.companies.insert("h-kpn".to_string(), "KPN".to_string());
        t.companies.insert("h-own".to_string(), "Shadowed".to_string());
        rules
    }

    #[test]
    fn test_hash_matcher_priority_groups() {
        let m = Matcher::hash_table(&tables());
        assert_eq!(m.apply(Some("h-own")).as_deref(), Some(NOT_A_COMPANY));
        assert_eq!(m.apply(Some("h-paypal")).as_deref(), Some(PAYPAL));
        assert_eq!(m.apply(Some("h-tikkie")).as_deref(), Some(TIKKIE));
        assert_eq!(
            m.apply(Some("h-library")).as_deref(),
            Some("Stichting AmstellandBibliotheken")
        );
        assert_eq!(m.apply(Some("h-kpn")).as_deref(), Some("KPN"));
        assert_eq!(m.apply(Some("h-unknown")), None);
    }

    #[test]
    fn test_hash_matcher_declines_missing_hash() {
        let m = Matcher::hash_table(&tables());
        assert_eq!(m.apply(None), None);
    }

    #[test]
    fn test_free_text_specific_before_loose() {
        let m = Matcher::free_text(&tables());
        assert_eq!(m.apply(Some("Mc Donald's McD Drive")).as_deref(), Some("McDonalds"));
        assert_eq!(m.apply(Some("MCDONALDS AMSTERDAM")).as_deref(), Some("McDonalds"));
        assert_eq!(m.apply(Some("AH to go Centraal")).as_deref(), Some("Albert Heijn"));
    }

    #[test]
    fn test_free_text_first_documented_rule_wins() {
        let m = Matcher::free_text(&tables());
        // "ns", " ing" and "klm" all occur; klm is listed before the loose fallbacks.
        assert_eq!(m.apply(Some("ns-klm-ing-transfer")).as_deref(), Some("KLM"));
    }

    #[test]
    fn test_free_text_reordered_policy_changes_result() {
        let rules = vec![
            DescriptionRule::new(&["ns"], "NS"),
            DescriptionRule::new(&["klm"], "KLM"),
        ];
        let m = Matcher::FreeText { rules };
        assert_eq!(m.apply(Some("ns-klm-ing-transfer")).as_deref(), Some("NS"));
    }

    #[test]
    fn test_free_text_unmatched() {
        let m = Matcher::free_text(&tables());
        assert_eq!(m.apply(Some("Unknown vendor XYZ")), None);
    }

    #[test]
    fn test_resolver_hash_before_description() {
        let resolver = MerchantResolver::standard(&tables());
        let rec = record("Albert Heijn 1403", Some("h-kpn"));
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("KPN"));
    }

    #[test]
    fn test_resolver_falls_back_to_description() {
        let resolver = MerchantResolver::standard(&tables());
        assert_eq!(
            resolver.resolve(&record("Albert Heijn 1403", Some("h-unknown"))).as_deref(),
            Some("Albert Heijn")
        );
        assert_eq!(
            resolver.resolve(&record("Albert Heijn 1403", None)).as_deref(),
            Some("Albert Heijn")
        );
    }

    #[test]
    fn test_resolver_unresolved_is_none() {
        let resolver = MerchantResolver::standard(&tables());
        assert_eq!(resolver.resolve(&record("Qwerty BV", None)), None);
    }

    #[test]
    fn test_resolver_skips_empty_results() {
        let mut rules = RuleSet::builtin().unwrap();
        rules.hash_tables.companies.insert("h-blank".to_string(), "  ".to_string());
        let resolver = MerchantResolver::standard(&rules);
        assert_eq!(
            resolver.resolve(&record("Jumbo Utrecht", Some("h-blank"))).as_deref(),
            Some("Jumbo")
        );
    }

    #[test]
    fn test_resolver_custom_order() {
        let rules = tables();
        let resolver = MerchantResolver::new(vec![
            (Matcher::free_text(&rules), Field::Description),
            (Matcher::hash_table(&rules), Field::CounterpartyHash),
        ]);
        let rec = record("Albert Heijn 1403", Some("h-kpn"));
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("Albert Heijn"));
    }

    #[test]
    fn test_notifications_consulted_only_when_enabled() {
        let mut rec = record("Betaling", None);
        rec.record.notifications = "Name: Spotify AB Description: premium".to_string();

        let mut rules = RuleSet::builtin().unwrap();
        assert_eq!(MerchantResolver::standard(&rules).resolve(&rec), None);

        rules.match_notifications = true;
        assert_eq!(
            MerchantResolver::standard(&rules).resolve(&rec).as_deref(),
            Some("Spotify")
        );
    }

    #[test]
    fn test_description_beats_notifications() {
        let mut rules = RuleSet::builtin().unwrap();
        rules.match_notifications = true;
        let mut rec = record("Jumbo Utrecht", None);
        rec.record.notifications = "Name: Spotify AB".to_string();
        assert_eq!(MerchantResolver::standard(&rules).resolve(&rec).as_deref(), Some("Jumbo"));
    }

    #[test]
    fn test_resolver_with_real_salted_hash() {
        let salt = Salt::new("test-salt");
        let hash = salted_hash(Some("NL86INGB0002445588"), &salt, DigestAlgorithm::Sha256).unwrap();
        let mut rules = RuleSet::builtin().unwrap();
        rules.hash_tables.companies.insert(hash.clone(), "Belastingdienst".to_string());
        let resolver = MerchantResolver::standard(&rules);
        let rec = record("Aanslag 2023", Some(&hash));
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("Belastingdienst"));
    }
}
