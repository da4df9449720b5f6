//! A map of dense integer key to value.

use std::marker::PhantomData;

pub trait Index: From<usize> {
    fn index(&self) -> usize;
}

/// A map of a dense integer key to value, implemented as a vector.
/// Effectively wraps Vec<V> to provide typed keys.
#[derive(Clone)]
pub struct DenseMap<K, V> {
    vec: Vec<V>,
    key_type: PhantomData<K>,
}

impl<K, V> Default for DenseMap<K, V> {
    fn default() -> Self {
        DenseMap {
            vec: Vec::default(),
            key_type: PhantomData,
        }
    }
}

impl<K: Index, V> std::ops::Index<K> for DenseMap<K, V> {
    type Output = V;

    fn index(&self, k: K) -> &Self::Output {
        &self.vec[k.index()]
    }
}

impl<K: Index, V> std::ops::IndexMut<K> for DenseMap<K, V> {
    fn index_mut(&mut self, k: K) -> &mut Self::Output {
        &mut self.vec[k.index()]
    }
}

impl<K: Index, V> DenseMap<K, V> {
    pub fn with_capacity(n: usize) -> Self {
        DenseMap {
            vec: Vec::with_capacity(n),
            key_type: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn lookup(&self, k: K) -> Option<&V> {
        self.vec.get(k.index())
    }

    pub fn push(&mut self, val: V) -> K {
        let id = K::from(self.vec.len());
        self.vec.push(val);
        id
    }

    pub fn all_ids(&self) -> impl Iterator<Item = K> {
        (0..self.vec.len()).map(K::from)
    }

    pub fn values(&self) -> std::slice::Iter<V> {
        self.vec.iter()
    }
}

impl<K: Index, V: Clone> DenseMap<K, V> {
    pub fn new_filled(n: usize, default: V) -> Self {
        let mut m = Self::default();
        m.vec.resize(n, default);
        m
    }
}

impl<K, V: PartialEq> PartialEq for DenseMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.vec == other.vec
    }
}
impl<K, V: Eq> Eq for DenseMap<K, V> {}

impl<K, V: std::fmt::Debug> std::fmt::Debug for DenseMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.vec.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    struct Id(usize);
    impl From<usize> for Id {
        fn from(n: usize) -> Id {
            Id(n)
        }
    }
    impl Index for Id {
        fn index(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn push_and_lookup() {
        let mut m: DenseMap<Id, &str> = DenseMap::default();
        let a = m.push("a");
        let b = m.push("b");
        assert_eq!(m[a], "a");
        assert_eq!(m.lookup(b), Some(&"b"));
        assert_eq!(m.lookup(Id(2)), None);
        assert_eq!(m.all_ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn new_filled() {
        let m: DenseMap<Id, usize> = DenseMap::new_filled(3, 0);
        assert_eq!(m.len(), 3);
        assert_eq!(m[Id(2)], 0);
    }
}
