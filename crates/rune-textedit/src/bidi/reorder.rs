use unicode_bidi::{BidiInfo, Level};

/// A maximal span of a line shown with one direction, listed in visual
/// order. `start..end` are logical char offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiRun {
    pub start: usize,
    pub end: usize,
    pub rtl: bool,
}

impl BidiRun {
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Visual-to-logical index map for chars with the given levels: entry `v`
/// is the logical index shown at visual position `v`.
pub fn visual_index_map(levels: &[Level]) -> Vec<usize> {
    if levels.is_empty() {
        return Vec::new();
    }
    BidiInfo::reorder_visual(levels)
}

/// Group a visual order into runs of one direction with contiguous logical
/// offsets. `breaks` are logical offsets that always end a run.
pub fn group_runs(visual: &[usize], levels: &[Level], breaks: &[usize]) -> Vec<BidiRun> {
    let mut runs: Vec<BidiRun> = Vec::new();
    for &logical in visual {
        let rtl = levels[logical].is_rtl();
        if let Some(run) = runs.last_mut() {
            let extends = if rtl {
                run.rtl && run.start == logical + 1 && !breaks.contains(&run.start)
            } else {
                !run.rtl && run.end == logical && !breaks.contains(&logical)
            };
            if extends {
                if rtl {
                    run.start = logical;
                } else {
                    run.end = logical + 1;
                }
                continue;
            }
        }
        runs.push(BidiRun {
            start: logical,
            end: logical + 1,
            rtl,
        });
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::{BaseDirection, levels_per_char};

    #[test]
    fn visual_index_map_matches_expected_for_mixed_line() {
        // Logical: 0:'a',1:'b',2:'c',3:' ',4:'א',5:'ב',6:'ג'
        let levels = levels_per_char("abc אבג", BaseDirection::Ltr);
        let map = visual_index_map(&levels);
        assert_eq!(map, vec![0, 1, 2, 3, 6, 5, 4]);
    }

    #[test]
    fn groups_runs_in_visual_order() {
        let levels = levels_per_char("abcדגהxyz", BaseDirection::Ltr);
        let visual = visual_index_map(&levels);
        let runs = group_runs(&visual, &levels, &[]);
        assert_eq!(
            runs,
            vec![
                BidiRun { start: 0, end: 3, rtl: false },
                BidiRun { start: 3, end: 6, rtl: true },
                BidiRun { start: 6, end: 9, rtl: false },
            ]
        );
    }

    #[test]
    fn breaks_split_runs() {
        let levels = levels_per_char("abcdef", BaseDirection::Ltr);
        let visual = visual_index_map(&levels);
        let runs = group_runs(&visual, &levels, &[3]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1], BidiRun { start: 3, end: 6, rtl: false });
    }
}
