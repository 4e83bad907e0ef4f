use futures::future::join_all;
use std::ops::Range;
use tracing::{info, warn};

use crate::error::{BackendError, IndexError};
use crate::model::{DisplayedItem, Displayable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub index: usize,
    pub backend: String,
    pub name: String,
}

#[derive(Debug)]
pub struct RemovalFailure {
    pub index: usize,
    pub backend: String,
    pub name: String,
    pub error: BackendError,
}

/// Outcome of one `delete` call. Indices refer to the snapshot as it was
/// before the call.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub removed: Vec<Removal>,
    pub failed: Vec<RemovalFailure>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Snapshot of displayed items addressed by position.
#[derive(Debug, Default)]
pub struct Store {
    items: Vec<DisplayedItem>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, items: Vec<DisplayedItem>) {
        self.items = items;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[DisplayedItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Result<&DisplayedItem, IndexError> {
        self.items.get(index).ok_or(IndexError::OutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn get_metadata(&self, index: usize) -> Result<String, IndexError> {
        self.get(index).map(DisplayedItem::metadata_json)
    }

    /// Removes the item at `start`, or the half-open range `start..end`.
    ///
    /// `end` past the last item is clamped. Removals run concurrently; items
    /// whose backend refused stay in the snapshot and show up in
    /// [`DeleteReport::failed`].
    pub async fn delete(
        &mut self,
        start: usize,
        end: Option<usize>,
    ) -> Result<DeleteReport, IndexError> {
        let range = self.resolve_range(start, end)?;
        let offset = range.start;

        let outcomes = join_all(self.items[range].iter().map(|item| item.remove())).await;

        let mut report = DeleteReport::default();
        for (position, outcome) in outcomes.into_iter().enumerate() {
            let index = offset + position;
            let item = &self.items[index];
            let backend = item.backend_name().to_string();
            let name = item.displayed_name();
            match outcome {
                Ok(()) => {
                    info!(index, backend = %backend, name = %name, "removed resource");
                    report.removed.push(Removal {
                        index,
                        backend,
                        name,
                    });
                }
                Err(error) => {
                    warn!(index, backend = %backend, name = %name, %error, "failed to remove resource");
                    report.failed.push(RemovalFailure {
                        index,
                        backend,
                        name,
                        error,
                    });
                }
            }
        }

        for removal in report.removed.iter().rev() {
            self.items.remove(removal.index);
        }
        Ok(report)
    }

    fn resolve_range(&self, start: usize, end: Option<usize>) -> Result<Range<usize>, IndexError> {
        let len = self.items.len();
        if let Some(end) = end
            && end < start
        {
            return Err(IndexError::ReversedRange { start, end });
        }
        if start >= len {
            return Err(IndexError::OutOfRange { index: start, len });
        }
        let end = end.map_or(start + 1, |end| end.min(len));
        Ok(start..end)
    }
}
