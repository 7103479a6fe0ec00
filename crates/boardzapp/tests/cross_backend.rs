//! The same script of operations must leave every backend holding the same
//! structure. Ids are generated per backend, so they are stripped before
//! comparing.

mod common;

use boardzapp::model::{SettingsPatch, TaskDraft, TaskPatch};
use boardzapp::provider::DataProvider;
use boardzapp::test_utils::{seed_board, seed_tasks};
use chrono::{TimeZone, Utc};
use common::{all_backends, Harness};
use serde_json::Value;

const ID_KEYS: [&str; 4] = ["id", "boardId", "columnId", "parentId"];

fn strip_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ID_KEYS {
                map.remove(key);
            }
            map.values_mut().for_each(strip_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_ids),
        _ => {}
    }
}

async fn run_script(p: &dyn DataProvider) {
    let deadline = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    let done_at = Utc.with_ymd_and_hms(2026, 3, 10, 18, 30, 0).unwrap();

    let (work, columns) = seed_board(p, "Work", &["Todo", "Doing", "Done"]).await;
    let (home, _) = seed_board(p, "Home", &["Chores"]).await;
    let tasks = seed_tasks(p, &columns[0].id, &["Write", "Review", "Ship", "Celebrate"]).await;

    p.create_task(TaskDraft::under(&tasks[0].id, "Outline").with_deadline(deadline))
        .await
        .unwrap();
    let draft = p
        .create_task(TaskDraft::under(&tasks[0].id, "Draft").with_description("first pass"))
        .await
        .unwrap();
    p.create_task(TaskDraft::under(&draft.id, "Intro").as_info())
        .await
        .unwrap();
    p.create_task(TaskDraft::in_column(&columns[1].id, "Standup").repeating_at("08:00"))
        .await
        .unwrap();

    p.update_task(
        &tasks[1].id,
        TaskPatch {
            done: Some(true),
            done_date: Some(Some(done_at)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    p.move_task(&tasks[2].id, Some(columns[1].id.as_str()), 0, None)
        .await
        .unwrap();
    p.move_task(&tasks[3].id, None, 0, Some(draft.id.as_str()))
        .await
        .unwrap();
    p.delete_task(&tasks[1].id).await.unwrap();
    p.reorder_boards(&[home.id.clone(), work.id.clone()])
        .await
        .unwrap();
    p.update_settings(SettingsPatch {
        selected_board_id: Some(Some(work.id.clone())),
        is_calendar_view: Some(true),
    })
    .await
    .unwrap();
}

async fn stripped_export(h: &Harness) -> Value {
    let p = h.as_provider();
    let doc = p.export_document().await.unwrap();
    let selected = doc
        .selected_board_id
        .as_ref()
        .and_then(|id| doc.boards.iter().find(|b| &b.id == id))
        .map(|b| b.name.clone());

    let mut value = serde_json::to_value(&doc).unwrap();
    strip_ids(&mut value);
    value["selectedBoardId"] = serde_json::json!(selected);
    value
}

#[tokio::test]
async fn test_backends_agree_after_same_operations() {
    let harnesses = all_backends().await;
    let mut exports = Vec::new();
    for h in &harnesses {
        run_script(h.as_provider()).await;
        exports.push((h.name, stripped_export(h).await));
    }

    let (first_name, first) = &exports[0];
    assert_eq!(first["selectedBoardId"], "Work");
    assert_eq!(first["boards"][0]["name"], "Home");
    for (name, export) in &exports[1..] {
        assert_eq!(export, first, "{} differs from {}", name, first_name);
    }
}

#[tokio::test]
async fn test_backends_agree_on_derived_queries() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

    let mut summaries = Vec::new();
    for h in all_backends().await {
        let p = h.as_provider();
        run_script(p).await;
        let boards = p.get_boards().await.unwrap();
        let work = boards.iter().find(|b| b.name == "Work").unwrap();
        let progress = p.board_progress(&work.id).await.unwrap();
        let due: Vec<String> = p
            .get_tasks_due_between(start, end)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        summaries.push((h.name, progress.to_string(), due));
    }

    let (_, progress, due) = &summaries[0];
    assert_eq!(due, &vec!["Outline".to_string()]);
    for (name, other_progress, other_due) in &summaries[1..] {
        assert_eq!(other_progress, progress, "{}", name);
        assert_eq!(other_due, due, "{}", name);
    }
}
