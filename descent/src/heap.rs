//! A list of bounded max-heaps laid out as three parallel matrices, one
//! heap per row: `indices` holds neighbour ids, `keys` the distances and
//! `flags` the new/old markers. The root of heap `i` is column 0 and the
//! children of column `c` are `2c + 1` and `2c + 2`. Empty slots carry
//! the [`NONE`] id and a key of +inf, which keeps them at the root until
//! a real candidate replaces them.
//!
//! Flags are one byte per slot rather than a packed bit vector; they sit
//! alongside the indices and keys in dense rows.

use ndarray::{Array2, ArrayViewMut1};

/// Reserved id marking an unoccupied slot. Negative, so it can never
/// collide with a data index.
pub const NONE: i32 = -1;

pub struct HeapList {
    n_heaps: usize,
    n_nodes: usize,
    pub indices: Array2<i32>,
    pub keys: Array2<f32>,
    pub flags: Array2<u8>,
}

impl HeapList {
    /// A flagged list with every slot empty: ids [`NONE`], keys `key0`
    /// and flags `flag0`. Pass +inf as `key0` so empty slots lose every
    /// comparison.
    pub fn new(n_heaps: usize, n_nodes: usize, key0: f32, flag0: u8) -> HeapList {
        HeapList {
            n_heaps,
            n_nodes,
            indices: Array2::from_elem((n_heaps, n_nodes), NONE),
            keys: Array2::from_elem((n_heaps, n_nodes), key0),
            flags: Array2::from_elem((n_heaps, n_nodes), flag0),
        }
    }

    /// Same layout without a flags matrix; used where the new/old
    /// distinction carries no information, such as query results and
    /// candidate lists.
    pub fn new_flagless(n_heaps: usize, n_nodes: usize, key0: f32) -> HeapList {
        HeapList {
            n_heaps,
            n_nodes,
            indices: Array2::from_elem((n_heaps, n_nodes), NONE),
            keys: Array2::from_elem((n_heaps, n_nodes), key0),
            flags: Array2::zeros((0, 0)),
        }
    }

    pub fn nheaps(&self) -> usize {
        self.n_heaps
    }

    pub fn nnodes(&self) -> usize {
        self.n_nodes
    }

    pub fn noflags(&self) -> bool {
        self.flags.nrows() == 0
    }

    /// Root key of heap `i`: the worst distance currently kept.
    pub fn max(&self, i: usize) -> f32 {
        self.keys[[i, 0]]
    }

    /// Number of occupied slots in heap `i`.
    pub fn size(&self, i: usize) -> usize {
        self.indices.row(i).iter().filter(|&&idx| idx != NONE).count()
    }

    pub fn contains(&self, i: usize, idx: i32) -> bool {
        self.indices.row(i).iter().any(|&x| x == idx)
    }

    /// Push into heap `i` if `key` beats the root and `idx` is not
    /// already present. Returns the number of slots changed (0 or 1).
    pub fn checked_push(&mut self, i: usize, idx: i32, key: f32) -> usize {
        checked_heap_push(&mut self.indices.row_mut(i), &mut self.keys.row_mut(i), idx, key)
    }

    /// As [`HeapList::checked_push`], recording `flag` alongside.
    pub fn checked_push_flagged(&mut self, i: usize, idx: i32, key: f32, flag: u8) -> usize {
        checked_flagged_heap_push(
            &mut self.indices.row_mut(i),
            &mut self.keys.row_mut(i),
            &mut self.flags.row_mut(i),
            idx,
            key,
            flag,
        )
    }

    /// Sorts every heap into ascending key order in place, permuting
    /// indices (and flags, when present) in lockstep. Only the second
    /// half of heapsort runs since the rows already satisfy the heap
    /// criterion.
    pub fn heapsort(&mut self) {
        for i in 0..self.n_heaps {
            for j in (1..self.n_nodes).rev() {
                self.swap_with_root(i, j);
                self.siftdown(i, j);
            }
        }
    }

    fn swap_with_root(&mut self, i: usize, j: usize) {
        self.indices.swap([i, 0], [i, j]);
        self.keys.swap([i, 0], [i, j]);
        if !self.noflags() {
            self.flags.swap([i, 0], [i, j]);
        }
    }

    /// Descends the root of heap `i` down the subtree `[0, stop)` until
    /// the max-heap criterion holds again.
    fn siftdown(&mut self, i: usize, stop: usize) {
        let idx = self.indices[[i, 0]];
        let key = self.keys[[i, 0]];
        let has_flags = !self.noflags();
        let flag = if has_flags { self.flags[[i, 0]] } else { 0 };

        let mut current = 0;
        loop {
            let left_child = 2 * current + 1;
            let right_child = left_child + 1;

            let swap;
            if left_child >= stop {
                break;
            } else if right_child >= stop || self.keys[[i, left_child]] >= self.keys[[i, right_child]] {
                if self.keys[[i, left_child]] > key {
                    swap = left_child;
                } else {
                    break;
                }
            } else if self.keys[[i, right_child]] > key {
                swap = right_child;
            } else {
                break;
            }

            self.indices[[i, current]] = self.indices[[i, swap]];
            self.keys[[i, current]] = self.keys[[i, swap]];
            if has_flags {
                self.flags[[i, current]] = self.flags[[i, swap]];
            }
            current = swap;
        }

        self.indices[[i, current]] = idx;
        self.keys[[i, current]] = key;
        if has_flags {
            self.flags[[i, current]] = flag;
        }
    }

}

/// Row-level push without flags. Rejects when `key` is no better than
/// the root or `idx` already occupies a slot; otherwise walks a hole
/// from the root toward the leaves, moving the larger child up (ties go
/// left), and writes the new entry into the final hole.
pub fn checked_heap_push(
    indices: &mut ArrayViewMut1<i32>,
    keys: &mut ArrayViewMut1<f32>,
    idx: i32,
    key: f32,
) -> usize {
    let n_nodes = keys.len();
    if key >= keys[0] {
        return 0;
    }

    // Break if we already have this element.
    if indices.iter().any(|&x| x == idx) {
        return 0;
    }

    let mut current = 0;
    loop {
        let left_child = 2 * current + 1;
        let right_child = left_child + 1;

        let swap;
        if left_child >= n_nodes {
            break;
        } else if right_child >= n_nodes || keys[left_child] >= keys[right_child] {
            if keys[left_child] > key {
                swap = left_child;
            } else {
                break;
            }
        } else if keys[right_child] > key {
            swap = right_child;
        } else {
            break;
        }

        indices[current] = indices[swap];
        keys[current] = keys[swap];
        current = swap;
    }

    indices[current] = idx;
    keys[current] = key;

    1
}

/// Row-level push carrying a flag through the siftdown.
pub fn checked_flagged_heap_push(
    indices: &mut ArrayViewMut1<i32>,
    keys: &mut ArrayViewMut1<f32>,
    flags: &mut ArrayViewMut1<u8>,
    idx: i32,
    key: f32,
    flag: u8,
) -> usize {
    let n_nodes = keys.len();
    if key >= keys[0] {
        return 0;
    }

    // Break if we already have this element.
    if indices.iter().any(|&x| x == idx) {
        return 0;
    }

    let mut current = 0;
    loop {
        let left_child = 2 * current + 1;
        let right_child = left_child + 1;

        let swap;
        if left_child >= n_nodes {
            break;
        } else if right_child >= n_nodes || keys[left_child] >= keys[right_child] {
            if keys[left_child] > key {
                swap = left_child;
            } else {
                break;
            }
        } else if keys[right_child] > key {
            swap = right_child;
        } else {
            break;
        }

        indices[current] = indices[swap];
        keys[current] = keys[swap];
        flags[current] = flags[swap];
        current = swap;
    }

    indices[current] = idx;
    keys[current] = key;
    flags[current] = flag;

    1
}
