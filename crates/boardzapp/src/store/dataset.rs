//! In-memory queries and change application over a [`Dataset`].
//!
//! Shared by the backends that hold the whole data set at once (the flat
//! document backend keeps it in memory, the remote backend fetches it per
//! operation). Queries return records in iteration order; sorting is the
//! store's job.

use super::backend::ChangeSet;
use crate::model::{Board, Column, Dataset, Task, TaskGroup};
use crate::ordering::{self, next_order};
use std::collections::{HashMap, HashSet};

impl Dataset {
    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn columns_of(&self, board_id: &str) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect()
    }

    pub fn tasks_in(&self, group: &TaskGroup) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| group.contains(t))
            .cloned()
            .collect()
    }

    /// Every task below `root_ids`, breadth first, roots excluded.
    pub fn descendants_of(&self, root_ids: &[String]) -> Vec<Task> {
        let mut children: HashMap<&str, Vec<&Task>> = HashMap::new();
        for task in &self.tasks {
            if let Some(parent) = task.parent_id.as_deref() {
                children.entry(parent).or_default().push(task);
            }
        }

        let mut seen: HashSet<&str> = root_ids.iter().map(String::as_str).collect();
        let mut frontier: Vec<&str> = root_ids.iter().map(String::as_str).collect();
        let mut found = Vec::new();

        while let Some(id) = frontier.pop() {
            for child in children.get(id).into_iter().flatten() {
                // Guards against parent cycles in corrupt data.
                if seen.insert(child.id.as_str()) {
                    frontier.push(child.id.as_str());
                    found.push((*child).clone());
                }
            }
        }
        found
    }

    /// Applies removals, then upserts, then settings.
    pub fn apply(&mut self, changes: &ChangeSet) {
        if !changes.removed_boards.is_empty() {
            let gone: HashSet<&str> = changes.removed_boards.iter().map(String::as_str).collect();
            self.boards.retain(|b| !gone.contains(b.id.as_str()));
        }
        if !changes.removed_columns.is_empty() {
            let gone: HashSet<&str> = changes.removed_columns.iter().map(String::as_str).collect();
            self.columns.retain(|c| !gone.contains(c.id.as_str()));
        }
        if !changes.removed_tasks.is_empty() {
            let gone: HashSet<&str> = changes.removed_tasks.iter().map(String::as_str).collect();
            self.tasks.retain(|t| !gone.contains(t.id.as_str()));
        }

        for board in &changes.boards {
            replace_or_push(&mut self.boards, board, |b| &b.id);
        }
        for column in &changes.columns {
            replace_or_push(&mut self.columns, column, |c| &c.id);
        }
        for task in &changes.tasks {
            replace_or_push(&mut self.tasks, task, |t| &t.id);
        }

        if let Some(settings) = &changes.settings {
            self.settings = settings.clone();
        }
    }

    /// Makes every sibling-group dense, keeping relative order. Orphaned tasks
    /// are left as they are.
    pub fn normalize_orders(&mut self) {
        ordering::sort_by_order(&mut self.boards);
        for (index, board) in self.boards.iter_mut().enumerate() {
            board.order = next_order(index);
        }

        ordering::sort_by_order(&mut self.columns);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for column in &mut self.columns {
            let count = counts.entry(column.board_id.clone()).or_insert(0);
            column.order = next_order(*count);
            *count += 1;
        }

        ordering::sort_by_order(&mut self.tasks);
        let mut counts: HashMap<TaskGroup, usize> = HashMap::new();
        for task in &mut self.tasks {
            if let Some(group) = task.group() {
                let count = counts.entry(group).or_insert(0);
                task.order = next_order(*count);
                *count += 1;
            }
        }
    }
}

fn replace_or_push<T: Clone>(records: &mut Vec<T>, record: &T, id: impl Fn(&T) -> &String) {
    match records.iter_mut().find(|r| id(r) == id(record)) {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Settings;

    fn sample() -> (Dataset, Task, Task, Task) {
        let board = Board::new("B", 0);
        let column = Column::new("C", &board.id, 0);
        let top = Task::new("Top", TaskGroup::Column(column.id.clone()), 0);
        let child = Task::new("Child", TaskGroup::Parent(top.id.clone()), 0);
        let grandchild = Task::new("Grandchild", TaskGroup::Parent(child.id.clone()), 0);
        let data = Dataset {
            settings: Settings::default(),
            boards: vec![board],
            columns: vec![column],
            tasks: vec![top.clone(), child.clone(), grandchild.clone()],
        };
        (data, top, child, grandchild)
    }

    #[test]
    fn test_tasks_in_column_excludes_subtasks() {
        let (data, top, _, _) = sample();
        let column_id = top.column_id.clone().unwrap();
        let tasks = data.tasks_in(&TaskGroup::Column(column_id));
        assert_eq!(tasks, vec![top]);
    }

    #[test]
    fn test_descendants_reach_all_depths() {
        let (data, top, child, grandchild) = sample();
        let mut ids: Vec<String> = data
            .descendants_of(&[top.id.clone()])
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort();
        let mut expected = vec![child.id, grandchild.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_descendants_survive_cycles() {
        let (mut data, top, child, _) = sample();
        // Corrupt: top's parent is its own child.
        data.tasks[0].parent_id = Some(child.id.clone());
        let found = data.descendants_of(&[top.id.clone()]);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_normalize_orders_per_group() {
        let (mut data, top, child, _) = sample();
        let second = Task::new("Second", TaskGroup::Column(top.column_id.clone().unwrap()), 7);
        let mut sibling = Task::new("Sibling", TaskGroup::Parent(top.id.clone()), 0);
        sibling.order = ordering::UNORDERED;
        data.tasks.push(second.clone());
        data.tasks.push(sibling.clone());
        data.tasks[1].order = 4;
        data.normalize_orders();

        assert_eq!(data.task(&top.id).unwrap().order, 0);
        assert_eq!(data.task(&second.id).unwrap().order, 1);
        assert_eq!(data.task(&child.id).unwrap().order, 0);
        assert_eq!(data.task(&sibling.id).unwrap().order, 1);
        assert_eq!(data.columns[0].order, 0);
    }

    #[test]
    fn test_normalize_orders_renumbers_boards() {
        let (mut data, _, _, _) = sample();
        data.boards[0].order = 5;
        let mut legacy = Board::new("Legacy", 0);
        legacy.order = ordering::UNORDERED;
        data.boards.push(legacy);
        data.boards.push(Board::new("First", 2));
        data.normalize_orders();

        let named: Vec<(&str, u32)> = data
            .boards
            .iter()
            .map(|b| (b.name.as_str(), b.order))
            .collect();
        assert_eq!(named, vec![("First", 0), ("B", 1), ("Legacy", 2)]);
    }

    #[test]
    fn test_apply_removes_then_upserts() {
        let (mut data, top, child, _) = sample();
        let mut changes = ChangeSet::new();
        changes.remove_task(child.id.clone());
        let mut renamed = top.clone();
        renamed.title = "Renamed".into();
        changes.put_task(renamed);
        data.apply(&changes);

        assert!(data.task(&child.id).is_none());
        assert_eq!(data.task(&top.id).unwrap().title, "Renamed");
        assert_eq!(data.tasks.len(), 2);
    }
}
