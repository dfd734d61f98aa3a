// HashIndexedList view suite.
//
// Each test documents which view behaviors are verified. The core
// invariants exercised:
// - Aliasing: every view reads and writes the one underlying list; a
//   mutation through any handle is visible through all others.
// - Fix-up: after an insertion or removal through one handle, every other
//   live view still covers the same items it covered before, grown by
//   insertions strictly inside it and clipped by removals overlapping it.
// - Permutations: views partially overlapping a sorted, shuffled or
//   reversed range are disposed; views containing it or disjoint from it
//   survive; contained views are mirrored by a reversal only.
// - Disposal: a disposed view fails every operation with ViewDisposed;
//   clearing or disposing the list disposes all of its views.
// - Fail-fast: any structural mutation through any handle trips outstanding
//   traversals of every handle; a slide only trips traversals of the view
//   that moved.
use array_collections::{CollectionError, Direction, HashIndexedList};
use rand_core::SeedableRng;
use rand_pcg::Lcg128Xsl64 as Pcg;

fn list<I: IntoIterator<Item = i32>>(items: I) -> HashIndexedList<i32> {
    items.into_iter().collect()
}

fn items(v: &HashIndexedList<i32>) -> Vec<i32> {
    v.to_vec().expect("live view")
}

fn window(v: &HashIndexedList<i32>) -> (usize, usize) {
    (v.offset().expect("live view"), v.len().expect("live view"))
}

// Test: two overlapping views over six items, insertion through the first.
// Assumes: v1 = (0, 3) and v2 = (2, 3).
// Verifies: v1 grows to size 4 and v2 moves to offset 3.
#[test]
fn overlapping_views_insert_through_view() {
    let l = list(0..6);
    let mut v1 = l.view(0, 3).unwrap();
    let v2 = l.view(2, 3).unwrap();
    v1.insert(1, 100).unwrap();
    assert_eq!(window(&v1), (0, 4));
    assert_eq!(window(&v2), (3, 3));
    assert_eq!(items(&v2), vec![2, 3, 4]);
    assert_eq!(items(&l), vec![0, 100, 1, 2, 3, 4, 5]);
    assert!(l.is_consistent());
}

// Test: nested views through insert, append and interval removal.
// Verifies: enclosing views grow, later views shift, an empty view at the
// insertion point stays put, and removals clip straddling views.
#[test]
fn nested_views_follow_mutations() {
    let l = list(0..10);
    let mut outer = l.view(2, 6).unwrap();
    let mut inner = outer.view(1, 3).unwrap();
    let edge = l.view(3, 0).unwrap();
    let tail = l.view(8, 2).unwrap();
    assert_eq!(window(&inner), (3, 3));

    inner.insert(0, 100).unwrap();
    assert_eq!(items(&inner), vec![100, 3, 4, 5]);
    assert_eq!(items(&outer), vec![2, 100, 3, 4, 5, 6, 7]);
    assert_eq!(window(&edge), (3, 0));
    assert_eq!(window(&tail), (9, 2));

    inner.add(200).unwrap();
    assert_eq!(items(&outer), vec![2, 100, 3, 4, 5, 200, 6, 7]);
    assert_eq!(items(&tail), vec![8, 9]);

    assert_eq!(outer.remove_interval(0, 3), Ok(vec![2, 100, 3]));
    assert_eq!(items(&outer), vec![4, 5, 200, 6, 7]);
    assert_eq!(items(&inner), vec![4, 5, 200]);
    assert_eq!(window(&edge), (2, 0));
    assert_eq!(window(&tail), (7, 2));
    assert_eq!(items(&l), vec![0, 1, 4, 5, 200, 6, 7, 8, 9]);
    assert!(l.is_consistent());
}

// Test: a seeded shuffle disposes views that overlap or sit inside it.
// Verifies: only views disjoint from or containing the range survive.
#[test]
fn shuffle_disposes_partial_views() {
    let l = list(0..9);
    let mut head = l.view(0, 4).unwrap();
    let straddle = l.view(2, 3).unwrap();
    let inside = l.view(1, 2).unwrap();
    let whole = l.view(0, 9).unwrap();
    let tail = l.view(7, 2).unwrap();

    let mut rng = Pcg::seed_from_u64(0x5eed);
    head.shuffle(&mut rng).unwrap();
    let mut shuffled = items(&head);
    shuffled.sort_unstable();
    assert_eq!(shuffled, vec![0, 1, 2, 3]);

    assert!(!straddle.is_valid());
    assert!(!inside.is_valid());
    assert!(whole.is_valid());
    assert_eq!(window(&whole), (0, 9));
    assert_eq!(items(&tail), vec![7, 8]);
    assert!(l.is_consistent());
}

// Test: reversal through a view mirrors the views inside it.
#[test]
fn reverse_mirrors_contained_views() {
    let l = list(0..8);
    let mut mid = l.view(1, 6).unwrap();
    let inner = l.view(2, 2).unwrap();
    mid.reverse().unwrap();
    assert_eq!(items(&mid), vec![6, 5, 4, 3, 2, 1]);
    assert_eq!(window(&inner), (4, 2));
    assert_eq!(items(&inner), vec![3, 2]);
}

// Test: clearing a view removes its items; clearing the list disposes views.
#[test]
fn clear_view_then_list() {
    let mut l = list(0..6);
    let mut v = l.view(1, 3).unwrap();
    let after = l.view(4, 2).unwrap();
    v.clear().unwrap();
    assert_eq!(window(&v), (1, 0));
    assert_eq!(items(&after), vec![4, 5]);
    assert_eq!(window(&after), (1, 2));
    assert_eq!(items(&l), vec![0, 4, 5]);

    l.clear().unwrap();
    assert!(!v.is_valid());
    assert!(!after.is_valid());
    assert_eq!(after.to_vec(), Err(CollectionError::ViewDisposed));
    assert_eq!(v.add(1), Err(CollectionError::ViewDisposed));
    assert_eq!(l.len(), Ok(0));
}

// Test: a disposed view fails every operation.
#[test]
fn disposed_view_errors() {
    let l = list(0..4);
    let mut v = l.view(1, 2).unwrap();
    v.dispose();
    assert!(!v.is_valid());
    assert!(v.is_view());
    assert_eq!(v.len(), Err(CollectionError::ViewDisposed));
    assert_eq!(v.contains(&1), Err(CollectionError::ViewDisposed));
    assert!(matches!(v.get(0), Err(CollectionError::ViewDisposed)));
    assert!(matches!(v.view(0, 0), Err(CollectionError::ViewDisposed)));
    assert!(matches!(v.cursor(Direction::Forwards), Err(CollectionError::ViewDisposed)));
    assert_eq!(v.slide(1), Err(CollectionError::ViewDisposed));
    assert_eq!(v.remove_first(), Err(CollectionError::ViewDisposed));
    assert_eq!(format!("{v:?}"), "<disposed view>");
    let mut it = v.iter();
    assert_eq!(it.next(), Some(Err(CollectionError::ViewDisposed)));
    assert_eq!(it.next(), None);
    assert_eq!(items(&l), vec![0, 1, 2, 3]);
}

// Test: sliding repositions the view without touching the list.
// Verifies: traversals of the list and of other views continue; only the
// slid view's own cursor is rejected.
#[test]
fn slide_moves_only_the_view() {
    let l = list(0..5);
    let mut v = l.view(0, 2).unwrap();
    let other = l.view(1, 3).unwrap();
    let g = l.generation();
    let mut it = l.iter();
    assert_eq!(it.next(), Some(Ok(0)));
    let mut oc = other.cursor(Direction::Forwards).unwrap();
    let mut vc = v.cursor(Direction::Forwards).unwrap();
    v.slide(3).unwrap();
    assert_eq!(items(&v), vec![3, 4]);
    assert_eq!(l.generation(), g);
    assert_eq!(it.next(), Some(Ok(1)));
    assert_eq!(other.step(&mut oc), Ok(Some(1)));
    assert_eq!(v.step(&mut vc), Err(CollectionError::ConcurrentModification));

    assert_eq!(v.try_slide(-1, 4), Ok(false));
    assert_eq!(v.try_slide(-1, 3), Ok(true));
    assert_eq!(items(&v), vec![2, 3, 4]);
    assert_eq!(v.try_slide(0, 9), Ok(false));
    assert_eq!(window(&v), (2, 3));

    let mut top = list(0..2);
    assert_eq!(top.try_slide(0, 1), Err(CollectionError::NotAView));
    assert_eq!(top.slide_resize(0, 1), Err(CollectionError::NotAView));
}

// Test: lookups through a view are relative to it; view_of pins one item.
#[test]
fn view_of_and_relative_positions() {
    let l = list(10..20);
    let v = l.view(4, 4).unwrap();
    assert_eq!(v.index_of(&15), Ok(Some(1)));
    assert_eq!(v.index_of(&10), Ok(None));
    assert_eq!(*v.get(3).unwrap(), 17);
    assert_eq!(
        v.get(4).map(|r| *r),
        Err(CollectionError::IndexOutOfRange { index: 4, len: 4 })
    );
    let one = v.view_of(&16).unwrap().expect("16 is inside the view");
    assert_eq!(window(&one), (6, 1));
    assert!(v.view_of(&19).unwrap().is_none());
    assert!(matches!(
        v.view(2, 3),
        Err(CollectionError::OutOfRange { offset: 2, size: 3, len: 4 })
    ));
    assert_eq!(format!("{v:?}"), "[14, 15, 16, 17]");
}

// Test: growth of the shared store while views are live.
#[test]
fn growth_with_live_views() {
    let mut l = HashIndexedList::with_capacity(2);
    l.add_all([0, 1, 2, 3]).unwrap();
    let a = l.view(0, 2).unwrap();
    let b = l.view(2, 2).unwrap();
    for i in 4..64 {
        l.add(i).unwrap();
    }
    assert_eq!(items(&a), vec![0, 1]);
    assert_eq!(items(&b), vec![2, 3], "a view ending at the append point stays");
    assert_eq!(l.len(), Ok(64));
    assert!(l.is_consistent());
}

// Test: bulk removal through a view clips other views per removed run.
#[test]
fn remove_all_through_view() {
    let l = list(0..10);
    let mut v = l.view(1, 8).unwrap();
    let left = l.view(0, 3).unwrap();
    let middle = l.view(4, 2).unwrap();
    let right = l.view(6, 4).unwrap();
    assert_eq!(v.remove_all([2, 4, 5, 8, 0]), Ok(4));
    assert_eq!(items(&v), vec![1, 3, 6, 7]);
    assert_eq!(items(&left), vec![0, 1]);
    assert_eq!(window(&middle), (3, 0));
    assert_eq!(items(&right), vec![6, 7, 9]);
    assert_eq!(items(&l), vec![0, 1, 3, 6, 7, 9]);
    assert!(l.is_consistent());
}

// Test: duplicates are checked against the whole list, not the window.
#[test]
fn duplicates_across_windows() {
    let l = list(0..4);
    let mut v = l.view(0, 2).unwrap();
    assert_eq!(v.add(3), Ok(false));
    assert_eq!(v.insert(1, 3), Err(CollectionError::DuplicateNotAllowed));
    assert_eq!(v.insert_all(0, [7, 2]), Err(CollectionError::DuplicateNotAllowed));
    assert_eq!(v.update_or_add(3), Err(CollectionError::DuplicateNotAllowed));
    assert_eq!(v.remove(&3), Ok(None), "removal is scoped to the window");
    assert_eq!(v.add(9), Ok(true));
    assert_eq!(items(&v), vec![0, 1, 9]);
    assert_eq!(items(&l), vec![0, 1, 9, 2, 3]);
}
