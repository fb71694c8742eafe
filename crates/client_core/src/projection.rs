use shared::domain::{Category, CategoryKey};

/// Locally held, ordered copy of the category list.
///
/// The projection trusts its input: it neither sorts nor validates what it is
/// given. Only the sortable list mutates it.
#[derive(Debug, Clone, Default)]
pub struct ListProjection {
    items: Vec<Category>,
}

impl ListProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the local sequence with `records` in the order supplied.
    pub fn initialize(&mut self, records: Vec<Category>) {
        self.items = records;
    }

    pub fn current_order(&self) -> &[Category] {
        &self.items
    }

    pub fn replace(&mut self, items: Vec<Category>) {
        self.items = items;
    }

    pub fn index_of(&self, key: &CategoryKey) -> Option<usize> {
        self.items.iter().position(|item| &item.key == key)
    }

    /// Returns false when `key` is not loaded.
    pub fn set_sort_order(&mut self, key: &CategoryKey, sort_order: i64) -> bool {
        match self.items.iter_mut().find(|item| &item.key == key) {
            Some(item) => {
                item.sort_order = sort_order;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(key: &str, sort_order: i64) -> Category {
        Category {
            key: CategoryKey::from(key),
            label: key.to_uppercase(),
            icon: "tag".into(),
            sort_order,
            is_system: false,
        }
    }

    #[test]
    fn initialize_keeps_supplied_order_without_sorting() {
        let mut projection = ListProjection::new();
        projection.initialize(vec![category("b", 1), category("a", 0)]);
        let keys: Vec<_> = projection
            .current_order()
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn set_sort_order_targets_key_not_position() {
        let mut projection = ListProjection::new();
        projection.initialize(vec![category("a", 0), category("b", 1)]);
        assert!(projection.set_sort_order(&CategoryKey::from("b"), 7));
        assert_eq!(projection.current_order()[1].sort_order, 7);
        assert!(!projection.set_sort_order(&CategoryKey::from("zzz"), 1));
    }

    #[test]
    fn index_of_finds_loaded_keys() {
        let mut projection = ListProjection::new();
        assert!(projection.is_empty());
        projection.initialize(vec![category("a", 0), category("b", 1)]);
        assert_eq!(projection.len(), 2);
        assert_eq!(projection.index_of(&CategoryKey::from("b")), Some(1));
        assert_eq!(projection.index_of(&CategoryKey::from("c")), None);
    }
}
