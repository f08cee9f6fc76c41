use std::collections::HashSet;

use super::task::TaskId;

/// Ids of tasks whose reminder already fired. An id stays here until it's explicitly cleared, so a
/// task can't be notified twice for the same reminder.
#[derive(Debug, Default)]
pub struct NotifiedSet {
    fired: HashSet<TaskId>,
}

impl NotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the task was already marked.
    pub fn insert(&mut self, id: TaskId) -> bool {
        self.fired.insert(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fired.contains(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.fired.remove(id)
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::NotifiedSet;

    #[test]
    fn test_insert_is_reported_once() {
        let mut set = NotifiedSet::new();
        assert!(set.insert("t1".into()));
        assert!(!set.insert("t1".into()));
        assert!(set.contains("t1"));
        assert_eq!(set.len(), 1);

        assert!(set.remove("t1"));
        assert!(!set.remove("t1"));
        assert!(set.is_empty());
    }
}
