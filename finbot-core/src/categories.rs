//! Category table: ordered keyword rules mapping message text to a label.
//!
//! Order matters. The first rule with a matching keyword wins, so the table
//! order is the tie-break for messages that mention several categories.

use serde::{Deserialize, Serialize};

use crate::finance::Direction;

/// Default direction attached to a category rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    Income,
    Expense,
    Either,
}

impl RuleDirection {
    /// Fixed direction this rule imposes, if any
    pub fn fixed(&self) -> Option<Direction> {
        match self {
            RuleDirection::Income => Some(Direction::Income),
            RuleDirection::Expense => Some(Direction::Expense),
            RuleDirection::Either => None,
        }
    }

    pub fn accepts(&self, direction: Direction) -> bool {
        self.fixed().is_none_or(|d| d == direction)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleDirection::Income => "income",
            RuleDirection::Expense => "expense",
            RuleDirection::Either => "either",
        }
    }

    /// Parse the `Type` column of a categories sheet
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "pemasukan" => Some(RuleDirection::Income),
            "expense" | "pengeluaran" => Some(RuleDirection::Expense),
            "either" | "any" | "" => Some(RuleDirection::Either),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub label: String,
    pub direction: RuleDirection,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl CategoryRule {
    pub fn new(label: &str, direction: RuleDirection, keywords: &[&str], icon: &str) -> Self {
        Self {
            label: label.to_string(),
            direction,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            icon: Some(icon.to_string()),
        }
    }

    /// True if any keyword occurs in `text` starting at a word boundary.
    /// `text` is expected to be normalized already.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| contains_keyword(text, k))
    }
}

/// Ordered rules plus the vocabulary that marks a message as income
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    income_keywords: Vec<String>,
}

impl CategoryTable {
    /// Build a table; keywords are lowercased and trimmed, blanks dropped.
    pub fn new(rules: Vec<CategoryRule>, income_keywords: Vec<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut r| {
                r.keywords = normalize_keywords(r.keywords);
                r
            })
            .collect();
        Self {
            rules,
            income_keywords: normalize_keywords(income_keywords),
        }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn income_keywords(&self) -> &[String] {
        &self.income_keywords
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Does the text contain a word from the income vocabulary?
    pub fn mentions_income(&self, text: &str) -> bool {
        self.income_keywords.iter().any(|k| contains_keyword(text, k))
    }

    /// First rule (in table order) matching `text`.
    ///
    /// With `only` set, rules whose direction cannot hold it are skipped.
    pub fn first_match(&self, text: &str, only: Option<Direction>) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .filter(|r| only.is_none_or(|d| r.direction.accepts(d)))
            .find(|r| r.matches(text))
    }

    /// Rules usable for the given direction, in table order
    pub fn rules_for(&self, direction: Direction) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().filter(move |r| r.direction.accepts(direction))
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(default_rules(), default_income_keywords())
    }
}

/// Built-in Indonesian table: income rules, then expense rules, then the
/// catch-all `Lainnya` that takes either direction.
pub fn default_rules() -> Vec<CategoryRule> {
    use RuleDirection::*;
    vec![
        CategoryRule::new("Gaji", Income, &["gaji", "salary", "upah"], "💰"),
        CategoryRule::new("Bonus", Income, &["bonus", "tunjangan"], "🎁"),
        CategoryRule::new("Investasi", Income, &["dividen", "bunga", "profit"], "📈"),
        CategoryRule::new("Freelance", Income, &["freelance", "project", "client"], "💻"),
        CategoryRule::new(
            "Makanan",
            Expense,
            &["makan", "food", "groceries", "restaurant", "cafe"],
            "🍽️",
        ),
        CategoryRule::new(
            "Transport",
            Expense,
            &["bensin", "fuel", "grab", "gojek", "taxi", "bus"],
            "🚗",
        ),
        CategoryRule::new("Belanja", Expense, &["beli", "shopping", "market", "mall"], "🛒"),
        CategoryRule::new(
            "Tagihan",
            Expense,
            &["listrik", "internet", "air", "telepon", "wifi"],
            "🧾",
        ),
        CategoryRule::new("Kesehatan", Expense, &["dokter", "obat", "hospital", "medical"], "🏥"),
        CategoryRule::new("Hiburan", Expense, &["movie", "game", "concert", "vacation"], "🎬"),
        CategoryRule::new("Pendidikan", Expense, &["kursus", "buku", "course", "training"], "📚"),
        CategoryRule::new("Lainnya", Either, &["lain", "other", "misc"], "💵"),
    ]
}

pub fn default_income_keywords() -> Vec<String> {
    [
        "gaji", "salary", "upah", "bonus", "tunjangan", "terima", "dapat", "pendapatan",
        "pemasukan", "income", "transfer masuk", "dividen", "bunga", "profit", "keuntungan",
        "freelance", "project fee",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// `keyword` occurs in `text` and the occurrence starts a word.
/// The match may run into a longer word (`makan` hits `makanan`).
pub(crate) fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    text.match_indices(keyword).any(|(i, _)| {
        text[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_requires_word_start() {
        assert!(contains_keyword("bayar air bulan ini", "air"));
        assert!(contains_keyword("makanan siang", "makan"));
        assert!(!contains_keyword("tiket ke kairo", "air"));
        assert!(contains_keyword("air", "air"));
        assert!(!contains_keyword("anything", ""));
    }

    #[test]
    fn test_phrase_keyword() {
        let table = CategoryTable::default();
        assert!(table.mentions_income("ada transfer masuk dari budi"));
        assert!(!table.mentions_income("transfer keluar"));
    }

    #[test]
    fn test_first_match_is_table_order() {
        let table = CategoryTable::default();
        // "beli" (Belanja) and "groceries" (Makanan): Makanan is listed first
        let rule = table.first_match("beli groceries", None).unwrap();
        assert_eq!(rule.label, "Makanan");
    }

    #[test]
    fn test_first_match_respects_direction_filter() {
        let table = CategoryTable::default();
        let rule = table.first_match("bonus makan", Some(Direction::Expense)).unwrap();
        assert_eq!(rule.label, "Makanan");
        let rule = table.first_match("bonus makan", Some(Direction::Income)).unwrap();
        assert_eq!(rule.label, "Bonus");
    }

    #[test]
    fn test_new_normalizes_keywords() {
        let table = CategoryTable::new(
            vec![CategoryRule {
                label: "Kopi".to_string(),
                direction: RuleDirection::Expense,
                keywords: vec!["  KOPI  ".to_string(), "".to_string(), "Es  Teh".to_string()],
                icon: None,
            }],
            vec!["GAJI".to_string()],
        );
        assert_eq!(table.rules()[0].keywords, vec!["kopi", "es teh"]);
        assert_eq!(table.income_keywords(), ["gaji"]);
    }

    #[test]
    fn test_rule_direction_parse() {
        assert_eq!(RuleDirection::parse("Income"), Some(RuleDirection::Income));
        assert_eq!(RuleDirection::parse("pengeluaran"), Some(RuleDirection::Expense));
        assert_eq!(RuleDirection::parse(""), Some(RuleDirection::Either));
        assert_eq!(RuleDirection::parse("sideways"), None);
    }

    #[test]
    fn test_rules_for_includes_either() {
        let table = CategoryTable::default();
        let labels: Vec<_> = table.rules_for(Direction::Income).map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Gaji", "Bonus", "Investasi", "Freelance", "Lainnya"]);
    }
}
