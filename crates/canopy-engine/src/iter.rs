//! Lazy iterator combinators for merging per-provider result sequences.

use std::collections::{HashSet, VecDeque};

use canopy_types::Resource;

/// Chains a sequence of iterators, advancing to the next part only when the
/// current one is exhausted. Finite and single-pass.
pub struct ChainedIter<T> {
    parts: VecDeque<Box<dyn Iterator<Item = T>>>,
}

impl<T> ChainedIter<T> {
    pub fn new(parts: Vec<Box<dyn Iterator<Item = T>>>) -> Self {
        Self {
            parts: parts.into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            parts: VecDeque::new(),
        }
    }
}

impl<T> Iterator for ChainedIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let current = self.parts.front_mut()?;
            match current.next() {
                Some(item) => return Some(item),
                None => {
                    self.parts.pop_front();
                }
            }
        }
    }
}

/// Drops resources whose name was already seen.
///
/// The visited set may be pre-seeded to suppress entries up front; combined
/// with a real-before-synthetic input order this makes real resources win
/// over synthetic placeholders of the same name.
pub struct UniqueResources<I> {
    input: I,
    visited: HashSet<String>,
}

impl<I> UniqueResources<I> {
    pub fn new(input: I, visited: HashSet<String>) -> Self {
        Self { input, visited }
    }
}

impl<I: Iterator<Item = Resource>> Iterator for UniqueResources<I> {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        for resource in self.input.by_ref() {
            if self.visited.insert(resource.name().to_string()) {
                return Some(resource);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(path: &str) -> Resource {
        Resource::synthetic(path)
    }

    #[test]
    fn test_chained_iter_in_order() {
        let parts: Vec<Box<dyn Iterator<Item = i32>>> = vec![
            Box::new(vec![1, 2].into_iter()),
            Box::new(std::iter::empty()),
            Box::new(vec![3].into_iter()),
        ];
        assert_eq!(ChainedIter::new(parts).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_chained_iter_empty() {
        assert_eq!(ChainedIter::<i32>::empty().count(), 0);
    }

    #[test]
    fn test_unique_first_seen_wins() {
        let input = vec![res("/p/a"), res("/p/b"), res("/q/a")].into_iter();
        let names: Vec<String> = UniqueResources::new(input, HashSet::new())
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_unique_preseeded_names_suppressed() {
        let input = vec![res("/p/a"), res("/p/b")].into_iter();
        let visited: HashSet<String> = ["b".to_string()].into();
        let names: Vec<String> = UniqueResources::new(input, visited)
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a"]);
    }
}
