use comfy_table::{Cell, Table};

use crate::cli::{load_rules, rules_path};
use crate::error::Result;
use crate::rules::RuleSet;
use crate::settings::load_settings;

pub fn list(rules: Option<&str>) -> Result<()> {
    let settings = load_settings()?;
    let path = rules_path(&settings, rules);
    let rule_set = load_rules(&settings, rules)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "built-in".to_string()
    };
    println!("Rules ({source})");
    println!("{}", format_rules(&rule_set));
    Ok(())
}

pub fn format_rules(rules: &RuleSet) -> String {
    let mut desc = Table::new();
    desc.set_header(vec!["#", "Patterns", "Company"]);
    for (i, rule) in rules.description_rules.iter().enumerate() {
        desc.add_row(vec![
            Cell::new(i + 1),
            Cell::new(rule.patterns.join(", ")),
            Cell::new(&rule.company),
        ]);
    }

    let c = &rules.categories;
    let mut cats = Table::new();
    cats.set_header(vec!["Category", "Companies"]);
    for (name, list) in [
        ("Salary", &c.salary),
        ("Fast food", &c.fastfood),
        ("Groceries", &c.groceries),
        ("Restaurant", &c.restaurant),
        ("Investment", &c.investment),
        ("Savings labels", &rules.savings_labels),
        ("Person to person", &rules.person_to_person),
    ] {
        let joined: Vec<&str> = list.iter().map(String::as_str).collect();
        cats.add_row(vec![Cell::new(name), Cell::new(joined.join(", "))]);
    }

    format!(
        "Description rules (first match wins)\n{desc}\n\nCategories\n{cats}\n\nKnown accounts: {}\nKnown counterparty hashes: {}\nCommunity name: {}",
        rules.known_account_count(),
        rules.known_hash_count(),
        rules.community_name
    )
}
