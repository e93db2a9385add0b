use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Spending category assigned to a parsed receipt. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    Transport,
    Shopping,
    #[serde(rename = "Bills & Utilities")]
    BillsAndUtilities,
    Entertainment,
    #[default]
    Other,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown category: '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 6] = [
        Category::FoodAndDining,
        Category::Transport,
        Category::Shopping,
        Category::BillsAndUtilities,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::BillsAndUtilities => "Bills & Utilities",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive. Accepts the display labels plus the short forms
    /// language models tend to answer with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase().replace(" and ", " & ");
        match norm.as_str() {
            "food & dining" | "food" | "dining" | "food/dining" => Ok(Category::FoodAndDining),
            "transport" | "transportation" | "travel" => Ok(Category::Transport),
            "shopping" => Ok(Category::Shopping),
            "bills & utilities" | "bills" | "utilities" | "bills/utilities" => {
                Ok(Category::BillsAndUtilities)
            }
            "entertainment" => Ok(Category::Entertainment),
            "other" | "others" => Ok(Category::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn label_roundtrip_for_every_variant() {
        for c in Category::ALL {
            assert_eq!(Category::from_str(c.label()).unwrap(), c);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_accepts_aliases() {
        assert_eq!(Category::from_str("FOOD AND DINING").unwrap(), Category::FoodAndDining);
        assert_eq!(Category::from_str(" bills ").unwrap(), Category::BillsAndUtilities);
        assert_eq!(Category::from_str("Transportation").unwrap(), Category::Transport);
    }

    #[test]
    fn parse_rejects_labels_outside_the_set() {
        let err = Category::from_str("Personal Transfer").unwrap_err();
        assert_eq!(err, UnknownCategory("Personal Transfer".into()));
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&Category::BillsAndUtilities).unwrap();
        assert_eq!(json, "\"Bills & Utilities\"");
        let back: Category = serde_json::from_str("\"Food & Dining\"").unwrap();
        assert_eq!(back, Category::FoodAndDining);
    }

    #[test]
    fn default_is_other() {
        assert_eq!(Category::default(), Category::Other);
    }
}
