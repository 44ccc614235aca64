//! The `rules` subcommand: validate and enumerate rule sets.

use anyhow::Result;
use colored::Colorize;
use loader::load_rules;
use std::path::Path;

pub fn verify_rules(path: &Path) -> Result<i32> {
    match load_rules(path) {
        Ok(set) => {
            println!(
                "{} {} rule(s) loaded from {}",
                "✔".green(),
                set.len(),
                path.display()
            );
            for category in set.categories() {
                let count = set
                    .rules()
                    .iter()
                    .filter(|r| r.category == category)
                    .count();
                println!("    {category:<20} {count}");
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("{} {e}", "✘".red());
            Ok(1)
        }
    }
}

pub fn list_rules(path: &Path) -> Result<i32> {
    let set = load_rules(path)?;
    for rule in set.rules() {
        let languages = if rule.languages.is_empty() {
            "all".to_string()
        } else {
            rule.languages
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "{:<24} {:<10} {:<18} {languages}",
            rule.id.bold(),
            rule.severity.to_string(),
            rule.category
        );
    }
    Ok(0)
}
