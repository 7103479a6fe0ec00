//! Completion statistics. Info tasks are annotations and never count.

use crate::model::Task;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks
            .into_iter()
            .filter(|t| !t.is_info)
            .fold(Progress::default(), |acc, t| Progress {
                done: acc.done + usize::from(t.done),
                total: acc.total + 1,
            })
    }

    /// Whole percent, rounded down. An empty set is 0%.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        u8::try_from(self.done * 100 / self.total).unwrap_or(100)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}
