use svndiff::{compose, Composed, Window};

use crate::error::Result;

/// Accumulates one window per link of a delta chain walk and folds them
/// into a single equivalent window.
///
/// Windows arrive outermost first. Once `done` is set, further links of
/// the chain cannot change the result and the walk can stop reading them:
/// either the accumulated window became self-contained, or a compose
/// reported that it never touches the deeper window's data.
#[derive(Debug, Default)]
pub(crate) struct WindowFold {
    combined: Option<Window>,
    done: bool,
    fed: bool,
}

impl WindowFold {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether further windows can still affect the result.
    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// Folds in the next window of the walk. `tview_start` is the absolute
    /// fulltext offset at which `window`'s target view begins.
    pub(crate) fn feed(&mut self, window: Window, tview_start: u64) -> Result<()> {
        self.fed = true;
        match self.combined.as_mut() {
            None => {
                self.done = window.is_self_contained();
                self.combined = Some(window);
            }
            Some(combined) => match compose(&window, tview_start, combined)? {
                Composed::Window(next) => {
                    self.done = next.is_self_contained();
                    *combined = next;
                }
                Composed::SecondStands {
                    sview_offset,
                    sview_len,
                } => {
                    combined.sview_offset = sview_offset;
                    combined.sview_len = sview_len;
                    self.done = true;
                }
            },
        }
        Ok(())
    }

    /// Marks end of stream. A fold that was never fed stays empty.
    pub(crate) fn finish(&mut self) {
        if self.fed {
            self.done = true;
        }
    }

    /// The folded window, if any link was fed.
    pub(crate) fn combined(&self) -> Option<&Window> {
        self.combined.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svndiff::Instruction;

    fn literal_window(data: &[u8]) -> Window {
        Window {
            tview_len: data.len() as u64,
            ops: vec![Instruction::CopyNew {
                len: data.len() as u64,
            }],
            new_data: data.to_vec(),
            ..Window::default()
        }
    }

    fn copy_window(sview_offset: u64, len: u64) -> Window {
        Window {
            sview_offset,
            sview_len: len,
            tview_len: len,
            ops: vec![Instruction::CopySource { offset: 0, len }],
            ..Window::default()
        }
    }

    #[test]
    fn an_unfed_fold_finishes_empty_and_not_done() {
        let mut fold = WindowFold::new();
        assert!(!fold.is_done());
        fold.finish();
        assert!(!fold.is_done());
        assert!(fold.combined().is_none());
    }

    #[test]
    fn a_self_contained_head_window_is_terminal() {
        let mut fold = WindowFold::new();
        fold.feed(literal_window(b"abc"), 0).expect("fold accepts");
        assert!(fold.is_done());
        assert_eq!(fold.combined().map(|w| w.tview_len), Some(3));
    }

    #[test]
    fn source_copies_keep_the_fold_open_until_finish() {
        let mut fold = WindowFold::new();
        fold.feed(copy_window(0, 4), 0).expect("fold accepts");
        assert!(!fold.is_done());
        fold.finish();
        assert!(fold.is_done());
    }

    #[test]
    fn composing_away_all_source_copies_terminates_the_fold() {
        let mut fold = WindowFold::new();
        // Outer window copies its whole source view...
        fold.feed(copy_window(0, 3), 0).expect("fold accepts");
        // ...which the deeper window produces entirely from literals.
        fold.feed(literal_window(b"xyz"), 0).expect("fold accepts");
        assert!(fold.is_done());
        let combined = fold.combined().expect("fold holds a window");
        assert_eq!(combined.src_ops(), 0);
        assert_eq!(combined.new_data, b"xyz");
    }

    #[test]
    fn a_standing_window_gets_its_source_view_rebased() {
        let mut fold = WindowFold {
            combined: Some(literal_window(b"hi")),
            done: false,
            fed: true,
        };
        fold.feed(copy_window(70, 5), 0).expect("fold accepts");
        assert!(fold.is_done());
        let combined = fold.combined().expect("fold holds a window");
        assert_eq!(combined.sview_offset, 70);
        assert_eq!(combined.sview_len, 5);
        assert_eq!(combined.new_data, b"hi");
    }
}
