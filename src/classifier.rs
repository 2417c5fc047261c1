use std::collections::BTreeSet;

use crate::models::{CategoryFlags, Direction, EnrichedRecord};
use crate::resolver::TIKKIE;
use crate::rules::{CategoryLists, RuleSet};

/// Boolean category predicates over a record whose direction and company are final.
#[derive(Debug, Clone)]
pub struct Classifier {
    lists: CategoryLists,
    savings_labels: BTreeSet<String>,
    person_to_person: BTreeSet<String>,
}

fn company_in(rec: &EnrichedRecord, list: &BTreeSet<String>) -> bool {
    // An unresolved company is never a member of any category.
    rec.company_name
        .as_deref()
        .is_some_and(|name| !name.is_empty() && list.contains(name))
}

impl Classifier {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            lists: rules.categories.clone(),
            savings_labels: rules.savings_labels.clone(),
            person_to_person: rules.person_to_person.clone(),
        }
    }

    pub fn is_salary(&self, rec: &EnrichedRecord) -> bool {
        company_in(rec, &self.lists.salary) && rec.direction == Direction::Incoming
    }

    pub fn is_fastfood(&self, rec: &EnrichedRecord) -> bool {
        company_in(rec, &self.lists.fastfood)
    }

    pub fn is_groceries(&self, rec: &EnrichedRecord) -> bool {
        company_in(rec, &self.lists.groceries)
    }

    pub fn is_restaurant(&self, rec: &EnrichedRecord) -> bool {
        company_in(rec, &self.lists.restaurant)
    }

    pub fn is_savings(&self, rec: &EnrichedRecord) -> bool {
        self.savings_labels.contains(rec.record.description.as_str())
    }

    pub fn is_investment(&self, rec: &EnrichedRecord) -> bool {
        company_in(rec, &self.lists.investment)
    }

    pub fn is_person_to_person(&self, rec: &EnrichedRecord) -> bool {
        rec.counterparty_hash
            .as_deref()
            .is_some_and(|h| self.person_to_person.contains(h))
    }

    pub fn is_expense(&self, rec: &EnrichedRecord) -> bool {
        if self.is_savings(rec) {
            return false;
        }
        rec.direction == Direction::Outgoing
    }

    pub fn is_income(&self, rec: &EnrichedRecord) -> bool {
        if self.is_salary(rec) {
            return true;
        }
        self.is_investment(rec) && rec.direction == Direction::Incoming
    }

    pub fn is_tikkie(&self, rec: &EnrichedRecord) -> bool {
        rec.company_name.as_deref() == Some(TIKKIE)
            || rec.record.description.to_lowercase().contains("tikkie")
    }

    /// Direct debits carry a SEPA mandate; only outgoing ones recur on our side.
    pub fn is_recurring_payment(&self, rec: &EnrichedRecord) -> bool {
        rec.mandate_id.is_some() && rec.direction == Direction::Outgoing
    }

    pub fn classify(&self, rec: &EnrichedRecord) -> CategoryFlags {
        CategoryFlags {
            is_salary: self.is_salary(rec),
            is_fastfood: self.is_fastfood(rec),
            is_groceries: self.is_groceries(rec),
            is_restaurant: self.is_restaurant(rec),
            is_savings: self.is_savings(rec),
            is_investment: self.is_investment(rec),
            is_income: self.is_income(rec),
            is_expense: self.is_expense(rec),
            is_person_to_person: self.is_person_to_person(rec),
            is_tikkie: self.is_tikkie(rec),
            is_recurring_payment: self.is_recurring_payment(rec),
        }
    }
}

/// Single reporting label per row, most specific flag first.
pub fn expense_category(flags: &CategoryFlags, direction: Direction) -> Option<String> {
    let ordered = [
        (flags.is_salary, "Salary"),
        (flags.is_income, "Income"),
        (flags.is_savings, "Savings"),
        (flags.is_investment, "Investment"),
        (flags.is_groceries, "Groceries"),
        (flags.is_fastfood, "Fast food"),
        (flags.is_restaurant, "Restaurant"),
        (flags.is_tikkie, "Tikkie"),
        (flags.is_person_to_person, "Person to person"),
        (flags.is_recurring_payment, "Recurring payment"),
        (direction == Direction::Outgoing, "Other expense"),
    ];
    ordered
        .iter()
        .find(|(flag, _)| *flag)
        .map(|(_, label)| label.to_string())
}
