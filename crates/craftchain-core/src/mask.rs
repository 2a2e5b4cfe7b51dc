use crate::id::ResourceId;
use serde::{Deserialize, Serialize};

/// Fixed-width bitset over unified resource indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMask {
    words: Vec<u64>,
}

impl ResourceMask {
    /// An empty mask able to hold `bits` indices.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * 64
    }

    /// Set a bit. Indices beyond capacity are ignored.
    pub fn set(&mut self, id: ResourceId) {
        let i = id.index();
        if let Some(word) = self.words.get_mut(i / 64) {
            *word |= 1u64 << (i % 64);
        }
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        let i = id.index();
        self.words
            .get(i / 64)
            .is_some_and(|word| word & (1u64 << (i % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// In-place union. The receiver grows if `other` is wider.
    pub fn union_with(&mut self, other: &ResourceMask) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    /// True if every bit in `required` is set in `self` or in `extra`.
    pub fn covers_with(&self, extra: &ResourceMask, required: &ResourceMask) -> bool {
        required.words.iter().enumerate().all(|(i, &req)| {
            let have = self.words.get(i).copied().unwrap_or(0)
                | extra.words.get(i).copied().unwrap_or(0);
            req & !have == 0
        })
    }

    /// True if every bit in `required` is set in `self`.
    pub fn covers(&self, required: &ResourceMask) -> bool {
        required.words.iter().enumerate().all(|(i, &req)| {
            req & !self.words.get(i).copied().unwrap_or(0) == 0
        })
    }

    /// Iterate set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros();
                w &= w - 1;
                Some(ResourceId(wi as u32 * 64 + bit))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_contains() {
        let mut m = ResourceMask::with_capacity(130);
        m.set(ResourceId(0));
        m.set(ResourceId(129));
        assert!(m.contains(ResourceId(0)));
        assert!(m.contains(ResourceId(129)));
        assert!(!m.contains(ResourceId(64)));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut m = ResourceMask::with_capacity(10);
        m.set(ResourceId(500));
        assert!(!m.contains(ResourceId(500)));
        assert!(m.is_empty());
    }

    #[test]
    fn covers_with_extra() {
        let mut have = ResourceMask::with_capacity(100);
        let mut extra = ResourceMask::with_capacity(100);
        let mut req = ResourceMask::with_capacity(100);
        have.set(ResourceId(3));
        extra.set(ResourceId(70));
        req.set(ResourceId(3));
        req.set(ResourceId(70));
        assert!(!have.covers(&req));
        assert!(have.covers_with(&extra, &req));
        req.set(ResourceId(71));
        assert!(!have.covers_with(&extra, &req));
    }

    #[test]
    fn iter_yields_sorted_bits() {
        let mut m = ResourceMask::with_capacity(200);
        for i in [150, 2, 64, 63] {
            m.set(ResourceId(i));
        }
        let bits: Vec<u32> = m.iter().map(|r| r.0).collect();
        assert_eq!(bits, vec![2, 63, 64, 150]);
    }

    #[test]
    fn union_grows_receiver() {
        let mut a = ResourceMask::with_capacity(64);
        let mut b = ResourceMask::with_capacity(128);
        a.set(ResourceId(1));
        b.set(ResourceId(100));
        assert!(!a.contains(ResourceId(100)));
        a.union_with(&b);
        assert!(a.contains(ResourceId(1)));
        assert!(a.contains(ResourceId(100)));
        assert!(a.covers(&b));
    }
}
