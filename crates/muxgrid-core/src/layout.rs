//! Grid layout calculation for multi-instance sessions.
//!
//! Pure and deterministic: a participant count maps to a grid geometry, and
//! to the split instructions that build it incrementally, since multiplexer
//! CLIs construct layouts by repeatedly splitting one pane into two rather
//! than declaring a grid atomically.

use muxgrid_mux_core::{MuxError, SplitDirection};

/// Grid geometry for a participant count. Positions are assigned in
/// participant order, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    pub positions: Vec<(usize, usize)>,
}

impl std::fmt::Display for GridLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// One incremental split: divide the pane of participant `parent`, giving the
/// new pane `percent` of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitStep {
    pub parent: usize,
    pub direction: SplitDirection,
    pub percent: u8,
}

fn grid(rows: usize, cols: usize, n: usize) -> GridLayout {
    GridLayout {
        rows,
        cols,
        positions: (0..n).map(|i| (i / cols, i % cols)).collect(),
    }
}

/// Map a participant count to a grid geometry.
///
/// Keeps the aspect ratio roughly square without fragmenting small counts:
/// 1→1x1, 2→1x2, 3..4→2x2, 5..6→3x2, 7..8→4x2, then ceil-sqrt rows.
pub fn compute_layout(n: usize) -> Result<GridLayout, MuxError> {
    match n {
        0 => Err(MuxError::LayoutInputInvalid(
            "participant count must be positive".to_string(),
        )),
        1 => Ok(grid(1, 1, 1)),
        2 => Ok(grid(1, 2, 2)),
        3..=4 => Ok(grid(2, 2, n)),
        5..=6 => Ok(grid(3, 2, n)),
        7..=8 => Ok(grid(4, 2, n)),
        _ => {
            let rows = (n as f64).sqrt().ceil() as usize;
            let cols = n.div_ceil(rows);
            Ok(grid(rows, cols, n))
        }
    }
}

/// Strict split plan for 1–4 participants.
///
/// The first participant keeps the pre-existing pane; `percent` applies to
/// every split (50 yields the even grid). For three participants the right
/// pane is stacked, leaving one full-height pane on the left; four
/// participants become a 2x2 grid from three splits.
pub fn split_plan(n: usize, percent: u8) -> Result<Vec<SplitStep>, MuxError> {
    let percent = percent.clamp(1, 99);
    let right = |parent| SplitStep {
        parent,
        direction: SplitDirection::Right,
        percent,
    };
    let bottom = |parent| SplitStep {
        parent,
        direction: SplitDirection::Bottom,
        percent,
    };
    match n {
        0 => Err(MuxError::LayoutInputInvalid(
            "participant count must be positive".to_string(),
        )),
        1 => Ok(vec![]),
        2 => Ok(vec![right(0)]),
        3 => Ok(vec![right(0), bottom(1)]),
        4 => Ok(vec![right(0), bottom(0), bottom(1)]),
        _ => Err(MuxError::LayoutInputInvalid(format!(
            "strict grid path supports at most 4 participants, got {n}"
        ))),
    }
}

/// Incremental plan for ad hoc layouts beyond the strict grid path.
///
/// Each additional pane is carved off the root's region with a bottom split
/// at `100 / (remaining + 1)`, where `remaining` counts the participants not
/// yet placed at that step. Successive equal fractions of a shrinking region
/// come out as even slices of the whole. This intentionally diverges from the
/// grid geometry used elsewhere; ad hoc layouts only need roughly even
/// stacking.
pub fn stacked_plan(n: usize) -> Result<Vec<SplitStep>, MuxError> {
    if n == 0 {
        return Err(MuxError::LayoutInputInvalid(
            "participant count must be positive".to_string(),
        ));
    }
    Ok((1..n)
        .map(|i| {
            let remaining = n - i;
            SplitStep {
                parent: 0,
                direction: SplitDirection::Bottom,
                percent: (100 / (remaining + 1)).clamp(1, 99) as u8,
            }
        })
        .collect())
}

/// Direction a grid-shaped incremental build splits for `index`: a new row
/// opens with a bottom split, otherwise the pane goes to the right. The first
/// participant needs no split.
pub fn fill_direction(layout: &GridLayout, index: usize) -> Option<SplitDirection> {
    if index == 0 {
        return None;
    }
    let (row, col) = *layout.positions.get(index)?;
    if col == 0 && row > 0 {
        Some(SplitDirection::Bottom)
    } else {
        Some(SplitDirection::Right)
    }
}

/// Even share of the axis being divided.
pub fn fill_percent(layout: &GridLayout, direction: SplitDirection) -> u8 {
    let share = match direction {
        SplitDirection::Right => 100 / layout.cols.max(1),
        SplitDirection::Bottom => 100 / layout.rows.max(1),
    };
    share.clamp(1, 99) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_shapes() {
        assert_eq!(compute_layout(1).unwrap().to_string(), "1x1");
        assert_eq!(compute_layout(2).unwrap().to_string(), "1x2");
        assert_eq!(compute_layout(3).unwrap().to_string(), "2x2");
        assert_eq!(compute_layout(4).unwrap().to_string(), "2x2");
        assert_eq!(compute_layout(5).unwrap().to_string(), "3x2");
        assert_eq!(compute_layout(6).unwrap().to_string(), "3x2");
        assert_eq!(compute_layout(7).unwrap().to_string(), "4x2");
        assert_eq!(compute_layout(8).unwrap().to_string(), "4x2");
        assert_eq!(compute_layout(9).unwrap().to_string(), "3x3");
        assert_eq!(compute_layout(10).unwrap().to_string(), "4x3");
    }

    // Every participant gets a unique in-bounds position, assigned row-major.
    #[test]
    fn test_positions_unique_and_in_bounds() {
        for n in 1..=12 {
            let layout = compute_layout(n).unwrap();
            assert_eq!(layout.positions.len(), n, "n={n}");
            assert!(layout.rows * layout.cols >= n, "n={n}");
            let mut seen = std::collections::BTreeSet::new();
            for &(row, col) in &layout.positions {
                assert!(row < layout.rows, "n={n}");
                assert!(col < layout.cols, "n={n}");
                assert!(seen.insert((row, col)), "duplicate position for n={n}");
            }
        }
    }

    #[test]
    fn test_layout_deterministic() {
        for n in 1..=12 {
            assert_eq!(compute_layout(n).unwrap(), compute_layout(n).unwrap());
        }
    }

    #[test]
    fn test_zero_participants_rejected() {
        assert!(matches!(
            compute_layout(0),
            Err(MuxError::LayoutInputInvalid(_))
        ));
        assert!(matches!(split_plan(0, 50), Err(MuxError::LayoutInputInvalid(_))));
        assert!(matches!(stacked_plan(0), Err(MuxError::LayoutInputInvalid(_))));
    }

    #[test]
    fn test_split_plan_op_counts() {
        assert_eq!(split_plan(1, 50).unwrap().len(), 0);
        assert_eq!(split_plan(2, 50).unwrap().len(), 1);
        assert_eq!(split_plan(3, 50).unwrap().len(), 2);
        assert_eq!(split_plan(4, 50).unwrap().len(), 3);
    }

    #[test]
    fn test_split_plan_three_stacks_the_right_pane() {
        let plan = split_plan(3, 50).unwrap();
        assert_eq!(
            plan[0],
            SplitStep { parent: 0, direction: SplitDirection::Right, percent: 50 }
        );
        assert_eq!(
            plan[1],
            SplitStep { parent: 1, direction: SplitDirection::Bottom, percent: 50 }
        );
    }

    #[test]
    fn test_split_plan_four_builds_two_by_two() {
        let plan = split_plan(4, 50).unwrap();
        assert_eq!(plan[0].parent, 0);
        assert_eq!(plan[0].direction, SplitDirection::Right);
        assert_eq!(plan[1].parent, 0);
        assert_eq!(plan[1].direction, SplitDirection::Bottom);
        assert_eq!(plan[2].parent, 1);
        assert_eq!(plan[2].direction, SplitDirection::Bottom);
    }

    #[test]
    fn test_split_plan_rejects_beyond_grid_path() {
        assert!(matches!(split_plan(5, 50), Err(MuxError::LayoutInputInvalid(_))));
    }

    #[test]
    fn test_stacked_plan_even_slices() {
        let plan = stacked_plan(5).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|s| s.parent == 0));
        assert!(plan.iter().all(|s| s.direction == SplitDirection::Bottom));
        // 100/5, 100/4, 100/3, 100/2 of the shrinking root region
        let percents: Vec<u8> = plan.iter().map(|s| s.percent).collect();
        assert_eq!(percents, vec![20, 25, 33, 50]);
    }

    #[test]
    fn test_stacked_plan_single() {
        assert!(stacked_plan(1).unwrap().is_empty());
    }

    #[test]
    fn test_fill_helpers() {
        let layout = compute_layout(4).unwrap();
        assert_eq!(fill_direction(&layout, 0), None);
        assert_eq!(fill_direction(&layout, 1), Some(SplitDirection::Right));
        assert_eq!(fill_direction(&layout, 2), Some(SplitDirection::Bottom));
        assert_eq!(fill_direction(&layout, 3), Some(SplitDirection::Right));
        assert_eq!(fill_percent(&layout, SplitDirection::Right), 50);
        assert_eq!(fill_percent(&layout, SplitDirection::Bottom), 50);

        let tall = compute_layout(6).unwrap();
        assert_eq!(fill_percent(&tall, SplitDirection::Bottom), 33);
    }
}
