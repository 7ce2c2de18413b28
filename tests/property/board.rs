//! Property-based tests for column derivation, filtering and drop planning.
//!
//! Uses proptest to verify:
//! 1. Partitioning places every task exactly once, in its status column.
//! 2. Each column is sorted and the result ignores input order.
//! 3. A blank search term shows the full board; a term only narrows it.
//! 4. Reorder plans leave the column densely numbered and only write
//!    tasks whose order changed.
//! 5. Transfers renumber the destination and leave the source's stored
//!    orders alone.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use join_board::columns::{Column, compare_tasks, partition, update_columns};
use join_board::dragdrop::{DragDropEngine, DropEvent, map_visible_index};
use join_board::filter::{filter_columns, normalize_term, task_matches};
use join_board::notify::LogNotifier;
use join_board::store::memory::InMemoryTaskStore;
use join_proto::column::ColumnId;
use join_proto::task::{StoredStatus, Task, TaskId, TaskStatus};
use proptest::prelude::*;

// --- Strategies ---

/// Tasks with unique ids, any of the four statuses or an unknown one,
/// sparse or missing orders, and colliding titles.
fn arb_tasks(max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (0usize..5, prop::option::of(-3i64..12), "[a-cA-C]{0,3}"),
        0..max,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (status, order, title))| {
                let mut task = Task::new(title, TaskStatus::Todo).with_id(format!("t{i:03}"));
                task.status = TaskStatus::ALL
                    .get(status)
                    .map_or_else(|| StoredStatus::Unrecognized("icebox".to_string()), |s| StoredStatus::Known(*s));
                task.order = order;
                task
            })
            .collect()
    })
}

/// A single column's worth of tasks.
fn arb_column_tasks(status: TaskStatus, range: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((prop::option::of(-3i64..12), "[a-c]{1,3}"), range).prop_map(move |specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (order, title))| {
                let mut task = Task::new(title, status).with_id(format!("{}{i:02}", status.as_str()));
                task.order = order;
                task
            })
            .collect()
    })
}

fn engine() -> DragDropEngine<InMemoryTaskStore, LogNotifier> {
    DragDropEngine::new(InMemoryTaskStore::new(), LogNotifier)
}

fn orders(column: &Column) -> Vec<Option<i64>> {
    column.tasks.iter().map(|t| t.order).collect()
}

fn id_of(task: &Task) -> TaskId {
    task.id.clone().unwrap()
}

proptest! {
    #[test]
    fn every_task_lands_exactly_once(tasks in arb_tasks(40)) {
        let result = partition(&tasks);
        prop_assert_eq!(result.columns.len(), 4);

        let placed: usize = result.columns.iter().map(|c| c.tasks.len()).sum();
        prop_assert_eq!(placed + result.unrecognized.len(), tasks.len());

        for (column, id) in result.columns.iter().zip(ColumnId::ALL) {
            prop_assert_eq!(column.id, id);
            for task in &column.tasks {
                prop_assert_eq!(task.known_status(), Some(id.status()));
            }
        }
        prop_assert!(result.unrecognized.iter().all(|t| t.known_status().is_none()));
    }

    #[test]
    fn columns_are_sorted_and_order_independent(
        (tasks, shuffled) in arb_tasks(30).prop_flat_map(|t| (Just(t.clone()), Just(t).prop_shuffle()))
    ) {
        let columns = update_columns(&tasks);
        for column in &columns {
            for pair in column.tasks.windows(2) {
                prop_assert_ne!(compare_tasks(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
            }
            let first_unordered = column.tasks.iter().position(|t| t.order.is_none());
            if let Some(start) = first_unordered {
                prop_assert!(column.tasks[start..].iter().all(|t| t.order.is_none()));
            }
        }
        prop_assert_eq!(update_columns(&shuffled), columns);
    }

    #[test]
    fn blank_term_shows_everything(tasks in arb_tasks(20), blank in "[ \t]{0,3}") {
        let columns = update_columns(&tasks);
        prop_assert_eq!(filter_columns(&columns, &blank), columns);
    }

    #[test]
    fn filter_only_narrows(tasks in arb_tasks(30), term in "[a-cA-C ]{1,3}") {
        let columns = update_columns(&tasks);
        let filtered = filter_columns(&columns, &term);
        let needle = normalize_term(&term);

        for (full, visible) in columns.iter().zip(&filtered) {
            prop_assert_eq!(full.id, visible.id);
            let mut rest = full.tasks.iter();
            for task in &visible.tasks {
                prop_assert!(rest.any(|t| t == task), "filtered column is not a subsequence");
            }
            if let Some(needle) = &needle {
                let title_match = full.title().to_lowercase().contains(needle.as_str());
                prop_assert!(title_match || visible.tasks.iter().all(|t| task_matches(t, needle)));
            }
        }
    }

    #[test]
    fn reorder_leaves_column_dense(
        tasks in arb_column_tasks(TaskStatus::Todo, 1..10),
        from_seed in any::<prop::sample::Index>(),
        to in 0usize..14,
    ) {
        let mut columns = update_columns(&tasks);
        let before: HashMap<TaskId, Option<i64>> =
            columns[0].tasks.iter().map(|t| (id_of(t), t.order)).collect();
        let from = from_seed.index(columns[0].tasks.len());
        let dragged = columns[0].tasks[from].clone();
        let event = DropEvent::new(dragged.clone(), "todoList", "todoList-mobile-list", from, to);

        let plan = engine().plan(&mut columns, &event, true).unwrap();

        let len = columns[0].tasks.len();
        prop_assert_eq!(len, tasks.len());
        prop_assert_eq!(plan.index, to.min(len - 1));
        prop_assert_eq!(columns[0].tasks[plan.index].id.as_ref(), dragged.id.as_ref());
        let dense: Vec<Option<i64>> = (0..len).map(|i| Some(i64::try_from(i).unwrap())).collect();
        prop_assert_eq!(orders(&columns[0]), dense);

        for (position, task) in columns[0].tasks.iter().enumerate() {
            let id = id_of(task);
            let written = plan.patches.iter().find(|(pid, _)| *pid == id);
            let changed = before[&id] != Some(i64::try_from(position).unwrap());
            prop_assert_eq!(written.is_some(), changed);
            if let Some((_, patch)) = written {
                prop_assert_eq!(patch.order, task.order);
                prop_assert!(patch.status.is_none());
            }
        }
    }

    #[test]
    fn transfer_renumbers_destination_only(
        source in arb_column_tasks(TaskStatus::Todo, 1..6),
        dest in arb_column_tasks(TaskStatus::Done, 0..6),
        from_seed in any::<prop::sample::Index>(),
        to in 0usize..8,
    ) {
        let all: Vec<Task> = source.iter().chain(&dest).cloned().collect();
        let mut columns = update_columns(&all);
        let source_before = orders(&columns[0]);
        let from = from_seed.index(columns[0].tasks.len());
        let dragged = columns[0].tasks[from].clone();
        let event = DropEvent::new(dragged.clone(), "todoList", "doneList", from, to);

        let plan = engine().plan(&mut columns, &event, true).unwrap();

        let mut expected_source = source_before;
        expected_source.remove(from);
        prop_assert_eq!(orders(&columns[0]), expected_source);

        let done = &columns[ColumnId::Done.index()];
        prop_assert_eq!(done.tasks.len(), dest.len() + 1);
        let dense: Vec<Option<i64>> =
            (0..done.tasks.len()).map(|i| Some(i64::try_from(i).unwrap())).collect();
        prop_assert_eq!(orders(done), dense);
        prop_assert_eq!(done.tasks[plan.index].known_status(), Some(TaskStatus::Done));

        let (first_id, first_patch) = &plan.patches[0];
        prop_assert_eq!(Some(first_id), dragged.id.as_ref());
        prop_assert_eq!(first_patch.status, Some(TaskStatus::Done));
        prop_assert!(plan.patches[1..].iter().all(|(_, p)| p.status.is_none()));
    }

    #[test]
    fn visible_index_maps_inside_the_column(
        tasks in arb_column_tasks(TaskStatus::Todo, 1..12),
        term in "[a-c]{1,2}",
        seed in any::<prop::sample::Index>(),
        visible_index in 0usize..14,
    ) {
        let columns = update_columns(&tasks);
        let full = &columns[0].tasks;
        let visible = filter_columns(&columns, &term).swap_remove(0).tasks;
        let moving = id_of(&full[seed.index(full.len())]);

        let index = map_visible_index(full, &visible, visible_index, &moving);
        prop_assert!(index < full.len());

        // The dragged task lands before the visible task it was dropped on.
        let rest: Vec<&Task> = visible.iter().filter(|t| !t.has_id(&moving)).collect();
        if let Some(anchor) = rest.get(visible_index) {
            let full_rest: Vec<&Task> = full.iter().filter(|t| !t.has_id(&moving)).collect();
            prop_assert_eq!(full_rest[index].id.as_ref(), anchor.id.as_ref());
        }
    }
}
