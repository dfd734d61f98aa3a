#![cfg(test)]

// State-machine tests for HashIndexedList and its views, kept inside the
// crate so every step can also run the internal consistency check and use
// crate-private error constructors.

use crate::error::CollectionError;
use crate::hash_indexed_list::HashIndexedList;
use proptest::prelude::*;
use std::hash::{BuildHasher, Hasher};

// Handle 0 is the list itself; handle k > 0 is the k-th view opened.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, u8),
    Insert(usize, usize, u8),
    Set(usize, usize, u8),
    Remove(usize, u8),
    RemoveAt(usize, usize),
    RemoveAll(usize, Vec<u8>),
    RetainAll(usize, Vec<u8>),
    Reverse(usize),
    Sort(usize),
    View(usize, usize, usize),
    Slide(usize, isize),
    Dispose(usize),
    Clear(usize),
    Contains(usize, u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    let h = 0usize..8;
    let x = 0u8..16;
    let i = 0usize..10;
    let xs = proptest::collection::vec(0u8..16, 0..6);
    prop_oneof![
        5 => (h.clone(), x.clone()).prop_map(|(h, x)| Op::Add(h, x)),
        4 => (h.clone(), i.clone(), x.clone()).prop_map(|(h, i, x)| Op::Insert(h, i, x)),
        2 => (h.clone(), i.clone(), x.clone()).prop_map(|(h, i, x)| Op::Set(h, i, x)),
        2 => (h.clone(), x.clone()).prop_map(|(h, x)| Op::Remove(h, x)),
        2 => (h.clone(), i.clone()).prop_map(|(h, i)| Op::RemoveAt(h, i)),
        1 => (h.clone(), xs.clone()).prop_map(|(h, xs)| Op::RemoveAll(h, xs)),
        1 => (h.clone(), xs).prop_map(|(h, xs)| Op::RetainAll(h, xs)),
        1 => h.clone().prop_map(Op::Reverse),
        1 => h.clone().prop_map(Op::Sort),
        3 => (h.clone(), 0usize..6, 0usize..5).prop_map(|(h, o, s)| Op::View(h, o, s)),
        2 => (h.clone(), -3isize..=3).prop_map(|(h, d)| Op::Slide(h, d)),
        1 => h.clone().prop_map(Op::Dispose),
        1 => h.clone().prop_map(Op::Clear),
        2 => (h, x).prop_map(|(h, x)| Op::Contains(h, x)),
    ]
}

// Reference model: a plain vector and per-view (offset, size) pairs updated
// one element at a time.
#[derive(Default)]
struct Model {
    items: Vec<u8>,
    views: Vec<Option<(usize, usize)>>,
}

impl Model {
    fn window(&self, h: usize) -> Option<(usize, usize)> {
        if h == 0 {
            Some((0, self.items.len()))
        } else {
            self.views[h - 1]
        }
    }

    fn insert(&mut self, h: usize, at: usize, x: u8) {
        self.items.insert(at, x);
        for (k, v) in self.views.iter_mut().enumerate() {
            let Some((o, s)) = v else { continue };
            if k + 1 == h {
                *s += 1;
            } else if *o < at && at < *o + *s {
                *s += 1;
            } else if *o > at || (*o == at && *s > 0) {
                *o += 1;
            }
        }
    }

    fn remove(&mut self, h: usize, at: usize) -> u8 {
        for (k, v) in self.views.iter_mut().enumerate() {
            let Some((o, s)) = v else { continue };
            if k + 1 == h || (*o <= at && at < *o + *s) {
                *s -= 1;
            } else if at < *o {
                *o -= 1;
            }
        }
        self.items.remove(at)
    }

    /// Remove the window positions selected by `doomed`, highest first.
    fn remove_where(&mut self, h: usize, doomed: impl Fn(u8) -> bool) -> usize {
        let Some((o, s)) = self.window(h) else { return 0 };
        let positions: Vec<usize> = (o..o + s).filter(|&p| doomed(self.items[p])).collect();
        for &p in positions.iter().rev() {
            self.remove(h, p);
        }
        positions.len()
    }

    fn permute(&mut self, h: usize, reverse: bool) {
        let Some((ro, rs)) = self.window(h) else { return };
        if rs == 0 {
            return;
        }
        let re = ro + rs;
        if reverse {
            self.items[ro..re].reverse();
        } else {
            self.items[ro..re].sort_unstable();
        }
        for (k, v) in self.views.iter_mut().enumerate() {
            let Some((o, s)) = *v else { continue };
            if k + 1 == h || o >= re || o + s <= ro || (o <= ro && re <= o + s) {
                continue;
            }
            if ro <= o && o + s <= re && reverse {
                *v = Some((ro + re - (o + s), s));
            } else {
                *v = None;
            }
        }
    }

    fn clear_all(&mut self) {
        self.items.clear();
        self.views.iter_mut().for_each(|v| *v = None);
    }
}

fn run<S>(list: HashIndexedList<u8, S>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut handles = vec![list];
    let mut model = Model::default();

    for op in ops {
        match op {
            Op::Add(h, x) => {
                let h = h % handles.len();
                let r = handles[h].add(x);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((o, s)) => {
                        let present = model.items.contains(&x);
                        prop_assert_eq!(r, Ok(!present));
                        if !present {
                            model.insert(h, o + s, x);
                        }
                    }
                }
            }
            Op::Insert(h, i, x) => {
                let h = h % handles.len();
                let r = handles[h].insert(i, x);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((_, s)) if i > s => prop_assert_eq!(r, Err(CollectionError::index(i, s))),
                    Some(_) if model.items.contains(&x) => {
                        prop_assert_eq!(r, Err(CollectionError::DuplicateNotAllowed))
                    }
                    Some((o, _)) => {
                        prop_assert_eq!(r, Ok(()));
                        model.insert(h, o + i, x);
                    }
                }
            }
            Op::Set(h, i, x) => {
                let h = h % handles.len();
                let r = handles[h].set(i, x);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((_, s)) if i >= s => prop_assert_eq!(r, Err(CollectionError::index(i, s))),
                    Some((o, _)) => match model.items.iter().position(|&y| y == x) {
                        Some(p) if p != o + i => {
                            prop_assert_eq!(r, Err(CollectionError::DuplicateNotAllowed))
                        }
                        _ => {
                            prop_assert_eq!(r, Ok(model.items[o + i]));
                            model.items[o + i] = x;
                        }
                    },
                }
            }
            Op::Remove(h, x) => {
                let h = h % handles.len();
                let r = handles[h].remove(&x);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((o, s)) => match model.items.iter().position(|&y| y == x) {
                        Some(p) if o <= p && p < o + s => {
                            prop_assert_eq!(r, Ok(Some(x)));
                            model.remove(h, p);
                        }
                        _ => prop_assert_eq!(r, Ok(None)),
                    },
                }
            }
            Op::RemoveAt(h, i) => {
                let h = h % handles.len();
                let r = handles[h].remove_at(i);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((_, s)) if i >= s => prop_assert_eq!(r, Err(CollectionError::index(i, s))),
                    Some((o, _)) => {
                        let expected = model.remove(h, o + i);
                        prop_assert_eq!(r, Ok(expected));
                    }
                }
            }
            Op::RemoveAll(h, xs) => {
                let h = h % handles.len();
                let r = handles[h].remove_all(xs.iter().copied());
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some(_) => {
                        let n = model.remove_where(h, |y| xs.contains(&y));
                        prop_assert_eq!(r, Ok(n));
                    }
                }
            }
            Op::RetainAll(h, xs) => {
                let h = h % handles.len();
                let r = handles[h].retain_all(xs.iter().copied());
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some(_) => {
                        let n = model.remove_where(h, |y| !xs.contains(&y));
                        prop_assert_eq!(r, Ok(n));
                    }
                }
            }
            Op::Reverse(h) | Op::Sort(h) => {
                let h = h % handles.len();
                let reverse = matches!(op, Op::Reverse(_));
                let r = if reverse {
                    handles[h].reverse()
                } else {
                    handles[h].sort()
                };
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some(_) => {
                        prop_assert_eq!(r, Ok(()));
                        model.permute(h, reverse);
                    }
                }
            }
            Op::View(h, off, size) => {
                let h = h % handles.len();
                let r = handles[h].view(off, size);
                match (model.window(h), r) {
                    (None, r) => prop_assert!(matches!(r, Err(CollectionError::ViewDisposed))),
                    (Some((_, s)), r) if off + size > s => {
                        let expected = CollectionError::OutOfRange {
                            offset: off as isize,
                            size,
                            len: s,
                        };
                        prop_assert!(matches!(r, Err(e) if e == expected));
                    }
                    (Some((o, _)), Ok(view)) => {
                        handles.push(view);
                        model.views.push(Some((o + off, size)));
                    }
                    (Some(_), Err(e)) => prop_assert!(false, "unexpected view error {:?}", e),
                }
            }
            Op::Slide(h, delta) => {
                let h = h % handles.len();
                let r = handles[h].slide(delta);
                let len = model.items.len();
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some(_) if h == 0 => prop_assert_eq!(r, Err(CollectionError::NotAView)),
                    Some((o, s)) => {
                        let target = o as isize + delta;
                        if target < 0 || target as usize + s > len {
                            let expected = CollectionError::OutOfRange {
                                offset: target,
                                size: s,
                                len,
                            };
                            prop_assert_eq!(r, Err(expected));
                        } else {
                            prop_assert_eq!(r, Ok(()));
                            model.views[h - 1] = Some((target as usize, s));
                        }
                    }
                }
            }
            Op::Dispose(h) => {
                let h = h % handles.len();
                handles[h].dispose();
                if h == 0 {
                    model.clear_all();
                } else {
                    model.views[h - 1] = None;
                }
            }
            Op::Clear(h) => {
                let h = h % handles.len();
                let r = handles[h].clear();
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some(_) if h == 0 => {
                        prop_assert_eq!(r, Ok(()));
                        model.clear_all();
                    }
                    Some(_) => {
                        prop_assert_eq!(r, Ok(()));
                        model.remove_where(h, |_| true);
                    }
                }
            }
            Op::Contains(h, x) => {
                let h = h % handles.len();
                let r = handles[h].contains(&x);
                match model.window(h) {
                    None => prop_assert_eq!(r, Err(CollectionError::ViewDisposed)),
                    Some((o, s)) => prop_assert_eq!(r, Ok(model.items[o..o + s].contains(&x))),
                }
            }
        }

        // Post-conditions after each op
        prop_assert!(handles[0].is_consistent());
        prop_assert_eq!(handles[0].to_vec(), Ok(model.items.clone()));
        for (k, expected) in model.views.iter().enumerate() {
            let view = &handles[k + 1];
            match *expected {
                None => prop_assert!(!view.is_valid()),
                Some((o, s)) => {
                    prop_assert!(view.is_valid());
                    prop_assert_eq!(view.offset(), Ok(o));
                    prop_assert_eq!(view.len(), Ok(s));
                    prop_assert_eq!(view.to_vec(), Ok(model.items[o..o + s].to_vec()));
                }
            }
        }
    }
    Ok(())
}

// Property: the list and every view opened on it agree with the model after
// each operation:
// - contents and order of the list and of each live view,
// - view offsets and sizes after inserts, removals, bulk removals and slides,
// - which views a reversal mirrors and which a sort disposes,
// - error kinds for disposed views, bad indices, duplicates and bad windows,
// - the index bijection and slot hygiene checked by `is_consistent`.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_list_and_views_match_model(ops in proptest::collection::vec(arb_op(), 1..80)) {
        run(HashIndexedList::new(), ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same model equivalence with every item in one hash bucket, so
// positions are resolved by equality probing alone.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_list_and_views_with_collisions(ops in proptest::collection::vec(arb_op(), 1..80)) {
        run(HashIndexedList::with_hasher(ConstBuildHasher), ops)?;
    }
}
