//! Entity trait: identity shared by every remote record.

use std::collections::HashMap;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Find the first entity in `items` whose id equals `id`.
pub fn find_by_id<E: Entity>(items: &[E], id: E::Id) -> Option<&E> {
    items.iter().find(|item| item.id() == id)
}

/// Index a slice of entities by id.
///
/// The first entity with a given id wins, so a lookup through the index
/// agrees with [`find_by_id`] when ids are duplicated.
pub fn index_by_id<E: Entity>(items: &[E]) -> HashMap<E::Id, &E> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        index.entry(item.id()).or_insert(item);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::CategoryId;
    use crate::model::Category;

    fn duplicated() -> Vec<Category> {
        vec![
            Category::new(CategoryId::new(3), "Toolbox"),
            Category::new(CategoryId::new(1), "Garden"),
            Category::new(CategoryId::new(3), "Gaming"),
        ]
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first_entity() {
        let categories = duplicated();
        let index = index_by_id(&categories);

        assert_eq!(index.len(), 2);
        assert_eq!(index[&CategoryId::new(3)].name, "Toolbox");
        assert_eq!(
            find_by_id(&categories, CategoryId::new(3)).map(|c| c.name.as_str()),
            Some("Toolbox")
        );
    }

    #[test]
    fn missing_id_is_absent() {
        let categories = duplicated();
        assert!(index_by_id(&categories).get(&CategoryId::new(9)).is_none());
        assert!(find_by_id(&categories, CategoryId::new(9)).is_none());
    }
}
