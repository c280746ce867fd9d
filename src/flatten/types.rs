use crate::error::KilnError;
use crate::records::CollisionPolicy;

/// Joins a parent name and a promoted node name, e.g. `order_item`
pub const DEFAULT_VERTICAL_SEPARATOR: &str = "_";

/// Joins a container name and a hoisted child name, e.g. `shipping-city`
pub const DEFAULT_LATERAL_SEPARATOR: &str = "-";

/// Marker for root-level leaves folded into every row, e.g. `base-currency`
pub const DEFAULT_BASE_PREFIX: &str = "base";

/// Configuration for the flattening process
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Separator used when a node is promoted past its parent
    pub vertical_separator: String,

    /// Separator used when descendant structure is collapsed in place
    pub lateral_separator: String,

    /// Prefix for root-level leaves copied into every row
    pub base_prefix: String,

    /// What to do when a row ends up with the same field twice
    pub collision_policy: CollisionPolicy,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            vertical_separator: String::from(DEFAULT_VERTICAL_SEPARATOR),
            lateral_separator: String::from(DEFAULT_LATERAL_SEPARATOR),
            base_prefix: String::from(DEFAULT_BASE_PREFIX),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl FlattenConfig {
    /// Separators must be non-empty and distinct, otherwise promoted and
    /// collapsed names could not be told apart
    pub fn validate(&self) -> Result<(), KilnError> {
        if self.vertical_separator.is_empty() || self.lateral_separator.is_empty() {
            return Err(KilnError::InvalidConfig(
                "separators must not be empty".to_string(),
            ));
        }
        if self.vertical_separator == self.lateral_separator {
            return Err(KilnError::InvalidConfig(format!(
                "vertical and lateral separators must differ (both are '{}')",
                self.vertical_separator
            )));
        }
        Ok(())
    }

    /// Name of a node after promotion past `parent`
    pub fn promoted_name(&self, parent: &str, node: &str) -> String {
        format!("{}{}{}", parent, self.vertical_separator, node)
    }

    /// Name of a child hoisted out of `container`
    pub fn lateral_name(&self, container: &str, child: &str) -> String {
        format!("{}{}{}", container, self.lateral_separator, child)
    }

    /// Name of a root-level leaf folded into a row
    pub fn base_name(&self, name: &str) -> String {
        self.lateral_name(&self.base_prefix, name)
    }

    /// Components of a promoted name
    pub fn name_parts<'a>(&self, name: &'a str) -> Vec<&'a str> {
        name.split(self.vertical_separator.as_str()).collect()
    }

    /// Whether `name` belongs to the promotion chain of `repeat_name`
    pub fn is_related(&self, name: &str, repeat_name: &str) -> bool {
        let sep = &self.vertical_separator;
        name == repeat_name
            || name.ends_with(&format!("{}{}", sep, repeat_name))
            || name.starts_with(&format!("{}{}", repeat_name, sep))
            || name.contains(&format!("{}{}{}", sep, repeat_name, sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let config = FlattenConfig::default();
        assert_eq!(config.promoted_name("order", "item"), "order_item");
        assert_eq!(config.lateral_name("shipping", "city"), "shipping-city");
        assert_eq!(config.base_name("currency"), "base-currency");
        assert_eq!(config.name_parts("orders_order_item"), vec!["orders", "order", "item"]);
    }

    #[test]
    fn test_related_names() {
        let config = FlattenConfig::default();
        assert!(config.is_related("item", "item"));
        assert!(config.is_related("order_item", "item"));
        assert!(config.is_related("item_detail", "item"));
        assert!(config.is_related("a_item_b", "item"));
        assert!(!config.is_related("items", "item"));
        assert!(!config.is_related("currency", "item"));
    }

    #[test]
    fn test_validate_rejects_ambiguous_separators() {
        let mut config = FlattenConfig::default();
        assert!(config.validate().is_ok());

        config.lateral_separator = config.vertical_separator.clone();
        assert!(matches!(config.validate(), Err(KilnError::InvalidConfig(_))));

        config.lateral_separator = String::new();
        assert!(matches!(config.validate(), Err(KilnError::InvalidConfig(_))));
    }
}
