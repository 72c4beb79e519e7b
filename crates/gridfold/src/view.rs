/// Logical view of the elements still alive while an array collapses.
///
/// After each reduction pass one representative per worker group survives;
/// the view maps the surviving logical index `i` to its physical slot
/// `stride * i` instead of threading raw multiplications through the
/// kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StridedView {
    stride: usize,
    len: usize,
}

impl StridedView {
    /// View over a freshly created array: every slot is a logical element.
    pub fn dense(len: usize) -> Self {
        Self { stride: 1, len }
    }

    /// Number of live logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Distance between consecutive logical elements, in physical slots.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Physical slot of logical element `index`.
    pub fn physical(&self, index: usize) -> usize {
        self.stride * index
    }

    /// View after a pass collapsed each group to one representative, which
    /// sits at the physical position of its group's first logical element.
    pub fn collapse(self, group_size: usize) -> Self {
        Self {
            stride: self.stride * group_size,
            len: (self.len - 1) / group_size + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_keeps_one_representative_per_group() {
        let view = StridedView::dense(100);
        let collapsed = view.collapse(8);
        assert_eq!(collapsed.len(), 13);
        assert_eq!(collapsed.stride(), 8);
        assert_eq!(collapsed.physical(3), 24);
    }

    #[test]
    fn repeated_collapse_reaches_a_single_element() {
        let mut view = StridedView::dense(1000);
        while view.len() > 1 {
            view = view.collapse(4);
        }
        assert_eq!(view.physical(0), 0);
        assert_eq!(view.len(), 1);
    }
}
