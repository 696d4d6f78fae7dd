use std::collections::HashSet;

/// Reserved identifiers of one naming scope. Generated names are allocated
/// through [`NameSet::get_unique_name`] so they never collide with existing
/// ones or with each other.
///
/// The set only grows. It is not synchronized; share it behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct NameSet {
    names: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name`. Adding a name twice is a no-op.
    pub fn add(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn add_range<I>(&mut self, names: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reserves and returns `original` if it is still free, otherwise the
    /// first free one of `original0`, `original1`, ...
    pub fn get_unique_name(&mut self, original: &str) -> String {
        if self.names.insert(original.to_string()) {
            return original.to_string();
        }
        (0u64..)
            .map(|postfix| format!("{original}{postfix}"))
            .find(|candidate| self.names.insert(candidate.clone()))
            .unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = NameSet::new();
        set.add_range(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for NameSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.add_range(iter);
    }
}
