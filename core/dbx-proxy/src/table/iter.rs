//! Keyset-paged iteration over a table

use super::Table;
use crate::error::DbxResult;
use crate::row::Row;
use crate::statement::StatementKind;
use crate::statement::sql;
use crate::value::ScalarValue;
use std::collections::VecDeque;

/// Lazy iterator over the rows of a table in ascending id order.
///
/// Ids are fetched a page at a time (`WHERE id > last ORDER BY id LIMIT n`),
/// so rows inserted or deleted ahead of the cursor are seen or skipped, and
/// rows behind it are never revisited.
pub struct TableIter {
    table: Table,
    batch_size: usize,
    last_id: i64,
    pending: VecDeque<i64>,
    exhausted: bool,
}

impl TableIter {
    pub(crate) fn new(table: Table, batch_size: usize) -> Self {
        Self {
            table,
            batch_size,
            last_id: i64::MIN,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> DbxResult<()> {
        let name = self.table.name();
        let result = self.table.run_query(
            StatementKind::IdsAfter,
            "",
            || sql::ids_after(name),
            &[
                ScalarValue::Integer(self.last_id),
                ScalarValue::Integer(self.batch_size as i64),
            ],
        )?;
        let ids = result.ids();
        if ids.len() < self.batch_size {
            self.exhausted = true;
        }
        if let Some(&last) = ids.last() {
            self.last_id = last;
        }
        self.pending.extend(ids);
        Ok(())
    }
}

impl Iterator for TableIter {
    type Item = DbxResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.pending
            .pop_front()
            .map(|id| Ok(self.table.row_handle(id)))
    }
}
