//! Keyword-rule enhancement classifier.
//!
//! Some foods raise thermogenesis beyond what their macros explain
//! (caffeine, capsaicin, ...). Each rule category carries a keyword set, a
//! multiplier above 1.0 and a display label. Entry names are matched by
//! case-insensitive substring; a category counts once, in the order it was
//! first matched.
//!
//! Multipliers combine by product with the ceiling applied after every step,
//! so the order of matched categories can change intermediate values but the
//! result never exceeds [`MAX_ENHANCEMENT_MULTIPLIER`].

use crate::constants::{MAX_ENHANCEMENT_MULTIPLIER, MIN_ENHANCEMENT_MULTIPLIER};
use crate::{round2, MealEntry};
use serde::{Deserialize, Serialize};

/// One named rule category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancementCategory {
    pub name: &'static str,
    /// Lowercase keywords matched as substrings of the lowercased entry name.
    pub keywords: &'static [&'static str],
    pub multiplier: f64,
    pub label: &'static str,
}

impl EnhancementCategory {
    fn matches(&self, lowered_name: &str) -> bool {
        self.keywords.iter().any(|kw| lowered_name.contains(kw))
    }
}

/// Built-in rule table. Order decides match order within a single entry.
pub static ENHANCEMENT_RULES: &[EnhancementCategory] = &[
    EnhancementCategory {
        name: "caffeine",
        keywords: &[
            "coffee",
            "espresso",
            "latte",
            "cappuccino",
            "americano",
            "macchiato",
            "mocha",
            "cold brew",
            "black tea",
            "iced tea",
            "chai",
            "cola",
            "energy drink",
            "yerba mate",
            "guarana",
        ],
        multiplier: 1.08,
        label: "Caffeine",
    },
    EnhancementCategory {
        name: "capsaicin",
        keywords: &[
            "chili",
            "chilli",
            "jalapeno",
            "jalapeño",
            "habanero",
            "cayenne",
            "sriracha",
            "hot sauce",
            "tabasco",
            "chipotle",
            "gochujang",
            "harissa",
            "szechuan",
        ],
        multiplier: 1.10,
        label: "Capsaicin (spicy food)",
    },
    EnhancementCategory {
        name: "catechins",
        keywords: &["green tea", "matcha", "sencha", "oolong"],
        multiplier: 1.04,
        label: "Green tea catechins",
    },
    EnhancementCategory {
        name: "mct",
        keywords: &["mct", "coconut oil"],
        multiplier: 1.05,
        label: "Medium-chain triglycerides",
    },
    EnhancementCategory {
        name: "ginger",
        keywords: &["ginger"],
        multiplier: 1.03,
        label: "Gingerols (ginger)",
    },
    EnhancementCategory {
        name: "pungent",
        keywords: &["black pepper", "mustard", "horseradish", "wasabi"],
        multiplier: 1.03,
        label: "Piperine & isothiocyanates",
    },
    EnhancementCategory {
        name: "vinegar",
        keywords: &["vinegar", "kombucha"],
        multiplier: 1.02,
        label: "Acetic acid (vinegar)",
    },
    EnhancementCategory {
        name: "cinnamon",
        keywords: &["cinnamon"],
        multiplier: 1.02,
        label: "Cinnamon",
    },
];

/// Outcome of classifying a meal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementResult {
    /// Distinct labels in first-match order.
    pub factors: Vec<String>,
    /// Combined multiplier, capped and rounded to two decimals.
    pub suggested_multiplier: f64,
}

impl Default for EnhancementResult {
    fn default() -> Self {
        Self {
            factors: Vec::new(),
            suggested_multiplier: MIN_ENHANCEMENT_MULTIPLIER,
        }
    }
}

/// Classify using the built-in rule table.
pub fn classify(entries: &[MealEntry]) -> EnhancementResult {
    classify_with_rules(entries, ENHANCEMENT_RULES)
}

/// Classify against an arbitrary rule table.
pub fn classify_with_rules(
    entries: &[MealEntry],
    rules: &[EnhancementCategory],
) -> EnhancementResult {
    let mut matched: Vec<&EnhancementCategory> = Vec::new();

    for entry in entries {
        let lowered = entry.name.to_lowercase();
        for rule in rules {
            if matched.iter().any(|m| m.label == rule.label) {
                continue;
            }
            if rule.matches(&lowered) {
                matched.push(rule);
            }
        }
    }

    let multiplier = matched.iter().fold(MIN_ENHANCEMENT_MULTIPLIER, |acc, rule| {
        (acc * rule.multiplier).min(MAX_ENHANCEMENT_MULTIPLIER)
    });

    EnhancementResult {
        factors: matched.iter().map(|rule| rule.label.to_string()).collect(),
        suggested_multiplier: round2(multiplier),
    }
}
