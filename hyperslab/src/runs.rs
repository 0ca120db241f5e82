//! Lowering selections to contiguous element runs
//!
//! A [`Runs`] iterator walks a selection in row-major order and yields maximal
//! runs of adjacent elements. Engines pair the runs of a file selection with
//! the runs of a memory selection ([`pair_runs`]) to get copy segments.

use crate::Selection;
use array_types::Shape;

/// A contiguous range of elements, in element units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: u64,
    pub len: u64,
}

/// One copy step between two selections, in element units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub file_start: u64,
    pub mem_start: u64,
    pub len: u64,
}

/// Row-major runs of a selection, with adjacent runs merged
pub struct Runs {
    /// Element stride of each outer (non-innermost) dimension
    outer_strides: Vec<u64>,
    /// Selected indices of each outer dimension
    outer_indices: Vec<Vec<u64>>,
    /// Runs within the innermost dimension
    inner: Vec<Run>,
    cursor: Vec<usize>,
    inner_pos: usize,
    done: bool,
    pending: Option<Run>,
}

impl Runs {
    pub(crate) fn new(selection: &Selection, extent: &Shape) -> Self {
        let rank = extent.rank();
        let last = rank - 1;

        // Extents reaching here have a representable element count.
        let mut strides = vec![1u64; rank];
        for d in (0..last).rev() {
            strides[d] = strides[d + 1].saturating_mul(extent[d + 1]);
        }

        let outer_indices: Vec<Vec<u64>> =
            (0..last).map(|d| selection.indices(d).collect()).collect();

        let offset = selection.offset[last];
        let count = selection.count[last];
        let stride = selection.stride_at(last);
        let block = selection.block_at(last);
        let inner = if stride == block {
            vec![Run {
                start: offset,
                len: count * block,
            }]
        } else {
            (0..count)
                .map(|k| Run {
                    start: offset + k * stride,
                    len: block,
                })
                .collect()
        };

        let done = selection.is_empty();
        Self {
            outer_strides: strides[..last].to_vec(),
            outer_indices,
            inner,
            cursor: vec![0; last],
            inner_pos: 0,
            done,
            pending: None,
        }
    }

    fn next_raw(&mut self) -> Option<Run> {
        if self.done {
            return None;
        }
        let base: u64 = self
            .cursor
            .iter()
            .enumerate()
            .map(|(d, &i)| self.outer_indices[d][i] * self.outer_strides[d])
            .sum();
        let run = self.inner[self.inner_pos];
        let out = Run {
            start: base + run.start,
            len: run.len,
        };

        self.inner_pos += 1;
        if self.inner_pos == self.inner.len() {
            self.inner_pos = 0;
            self.advance_outer();
        }
        Some(out)
    }

    fn advance_outer(&mut self) {
        for d in (0..self.cursor.len()).rev() {
            self.cursor[d] += 1;
            if self.cursor[d] < self.outer_indices[d].len() {
                return;
            }
            self.cursor[d] = 0;
        }
        self.done = true;
    }
}

impl Iterator for Runs {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        loop {
            match self.next_raw() {
                Some(run) => match self.pending.as_mut() {
                    Some(p) if p.start + p.len == run.start => p.len += run.len,
                    Some(_) => return self.pending.replace(run),
                    None => self.pending = Some(run),
                },
                None => return self.pending.take(),
            }
        }
    }
}

/// Zips two run streams covering the same number of elements
pub fn pair_runs<F, M>(file: F, mem: M) -> PairRuns<F::IntoIter, M::IntoIter>
where
    F: IntoIterator<Item = Run>,
    M: IntoIterator<Item = Run>,
{
    PairRuns {
        file: file.into_iter(),
        mem: mem.into_iter(),
        file_cur: None,
        mem_cur: None,
    }
}

pub struct PairRuns<F, M> {
    file: F,
    mem: M,
    file_cur: Option<Run>,
    mem_cur: Option<Run>,
}

impl<F, M> Iterator for PairRuns<F, M>
where
    F: Iterator<Item = Run>,
    M: Iterator<Item = Run>,
{
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let file = match self.file_cur.take() {
            Some(r) => r,
            None => self.file.next()?,
        };
        let mem = match self.mem_cur.take() {
            Some(r) => r,
            None => self.mem.next()?,
        };

        let len = file.len.min(mem.len);
        if file.len > len {
            self.file_cur = Some(Run {
                start: file.start + len,
                len: file.len - len,
            });
        }
        if mem.len > len {
            self.mem_cur = Some(Run {
                start: mem.start + len,
                len: mem.len - len,
            });
        }
        Some(Segment {
            file_start: file.start,
            mem_start: mem.start,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(dims: &[u64]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    fn run(start: u64, len: u64) -> Run {
        Run { start, len }
    }

    #[test]
    fn test_full_rows_merge_into_one_run() {
        let extent = shape(&[10, 30]);
        let sel = Selection::contiguous(vec![2, 0], vec![3, 30]);
        assert_eq!(sel.runs(&extent).collect::<Vec<_>>(), vec![run(60, 90)]);
    }

    #[test]
    fn test_partial_rows() {
        let extent = shape(&[4, 5]);
        let sel = Selection::contiguous(vec![1, 1], vec![2, 3]);
        assert_eq!(
            sel.runs(&extent).collect::<Vec<_>>(),
            vec![run(6, 3), run(11, 3)]
        );
    }

    #[test]
    fn test_strided_blocks() {
        let extent = shape(&[8, 8]);
        let sel = Selection::strided(
            vec![0, 1],
            Some(vec![4, 4]),
            vec![2, 2],
            Some(vec![2, 3]),
        );
        let runs: Vec<_> = sel.runs(&extent).collect();
        // rows 0,1,4,5; columns 1..4 and 5..8
        assert_eq!(
            runs,
            vec![
                run(1, 3),
                run(5, 3),
                run(9, 3),
                run(13, 3),
                run(33, 3),
                run(37, 3),
                run(41, 3),
                run(45, 3),
            ]
        );
        assert_eq!(runs.iter().map(|r| r.len).sum::<u64>(), 24);
    }

    #[test]
    fn test_rank_one() {
        let extent = shape(&[10]);
        let sel = Selection::strided(vec![1], Some(vec![3]), vec![3], Some(vec![2]));
        assert_eq!(
            sel.runs(&extent).collect::<Vec<_>>(),
            vec![run(1, 2), run(4, 2), run(7, 2)]
        );
    }

    #[test]
    fn test_empty_selection_has_no_runs() {
        let extent = shape(&[10, 3]);
        let sel = Selection::contiguous(vec![4, 0], vec![0, 3]);
        assert_eq!(sel.runs(&extent).count(), 0);
    }

    #[test]
    fn test_pair_runs_splits_on_shorter_side() {
        let segments: Vec<_> =
            pair_runs(vec![run(10, 3), run(20, 3)], vec![run(0, 6)]).collect();
        assert_eq!(
            segments,
            vec![
                Segment {
                    file_start: 10,
                    mem_start: 0,
                    len: 3
                },
                Segment {
                    file_start: 20,
                    mem_start: 3,
                    len: 3
                },
            ]
        );
    }

    #[test]
    fn test_pair_runs_uneven_split() {
        let segments: Vec<_> =
            pair_runs(vec![run(0, 4)], vec![run(100, 1), run(200, 3)]).collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].file_start, 1);
        assert_eq!(segments[1].mem_start, 200);
        assert_eq!(segments[1].len, 3);
    }
}
