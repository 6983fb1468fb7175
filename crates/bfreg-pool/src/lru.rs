//! Recency order over slot indices.
//!
//! A doubly linked list threaded through two index arrays, so promote,
//! demote and "least recent" are all O(1) with no allocation after
//! construction.

const NIL: u32 = u32::MAX;

#[derive(Debug)]
pub(crate) struct LruList {
    prev: Vec<u32>,
    next: Vec<u32>,
    /// Least recently used.
    head: u32,
    /// Most recently used.
    tail: u32,
}

impl LruList {
    /// All `n` slots in order, slot 0 least recent. `n` must be nonzero.
    pub(crate) fn new(n: u32) -> Self {
        let prev = (0..n).map(|i| if i == 0 { NIL } else { i - 1 }).collect();
        let next = (0..n).map(|i| if i + 1 == n { NIL } else { i + 1 }).collect();
        Self {
            prev,
            next,
            head: 0,
            tail: n - 1,
        }
    }

    /// The least recently used slot.
    pub(crate) fn lru(&self) -> u32 {
        self.head
    }

    fn unlink(&mut self, i: u32) {
        let (p, n) = (self.prev[i as usize], self.next[i as usize]);
        match p {
            NIL => self.head = n,
            p => self.next[p as usize] = n,
        }
        match n {
            NIL => self.tail = p,
            n => self.prev[n as usize] = p,
        }
    }

    /// Mark `i` most recently used.
    pub(crate) fn touch(&mut self, i: u32) {
        if self.tail == i {
            return;
        }
        self.unlink(i);
        self.prev[i as usize] = self.tail;
        self.next[i as usize] = NIL;
        self.next[self.tail as usize] = i;
        self.tail = i;
    }

    /// Mark `i` least recently used, so it is the next slot handed out.
    pub(crate) fn demote(&mut self, i: u32) {
        if self.head == i {
            return;
        }
        self.unlink(i);
        self.next[i as usize] = self.head;
        self.prev[i as usize] = NIL;
        self.prev[self.head as usize] = i;
        self.head = i;
    }

    /// Slots from least to most recent.
    pub(crate) fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            if cur == NIL {
                return None;
            }
            let out = cur;
            cur = self.next[cur as usize];
            Some(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn order(l: &LruList) -> Vec<u32> {
        l.iter().collect()
    }

    #[test]
    fn starts_in_index_order() {
        let l = LruList::new(4);
        assert_eq!(order(&l), vec![0, 1, 2, 3]);
        assert_eq!(l.lru(), 0);
    }

    #[test]
    fn touch_moves_to_back() {
        let mut l = LruList::new(4);
        l.touch(0);
        assert_eq!(order(&l), vec![1, 2, 3, 0]);
        l.touch(2);
        assert_eq!(order(&l), vec![1, 3, 0, 2]);
        l.touch(2);
        assert_eq!(order(&l), vec![1, 3, 0, 2]);
    }

    #[test]
    fn demote_moves_to_front() {
        let mut l = LruList::new(3);
        l.demote(2);
        assert_eq!(order(&l), vec![2, 0, 1]);
        assert_eq!(l.lru(), 2);
        l.demote(2);
        assert_eq!(order(&l), vec![2, 0, 1]);
    }

    #[test]
    fn single_slot() {
        let mut l = LruList::new(1);
        l.touch(0);
        l.demote(0);
        assert_eq!(order(&l), vec![0]);
    }

    proptest! {
        #[test]
        fn matches_reference_model(
            n in 1u32..8,
            ops in proptest::collection::vec((any::<bool>(), 0u32..8), 0..64),
        ) {
            let mut l = LruList::new(n);
            let mut model: Vec<u32> = (0..n).collect();
            for (front, i) in ops {
                let i = i % n;
                model.retain(|&x| x != i);
                if front {
                    l.demote(i);
                    model.insert(0, i);
                } else {
                    l.touch(i);
                    model.push(i);
                }
                prop_assert_eq!(order(&l), model.clone());
                prop_assert_eq!(l.lru(), model[0]);
            }
        }
    }
}
