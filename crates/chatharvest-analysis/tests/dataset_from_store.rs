// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chatharvest_analysis::build_dataset;
use chatharvest_config::model::{AnalysisConfig, StorageConfig};
use chatharvest_core::{Message, NewUser, Sender, StorageAdapter};
use chatharvest_storage::SqliteStorage;
use chrono::NaiveDate;

#[tokio::test]
async fn dataset_covers_only_the_agents_users() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("harvest.db").to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();

    let mut ids = Vec::new();
    for (name, support) in [("a", Some("Sato")), ("b", Some("Kato")), ("c", Some("Sato")), ("d", None)] {
        ids.push(
            storage
                .insert_user(&NewUser {
                    line_name: name.into(),
                    href: format!("/basic/friendlist/my_page/{name}"),
                    friend_registered_at: None,
                    support: support.map(str::to_string),
                })
                .await
                .unwrap(),
        );
    }
    let at = |minute| {
        NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    };
    storage
        .insert_messages(ids[0], &[
            Message {
                user_id: ids[0],
                sender: Sender::Customer,
                sender_name: None,
                text: "質問です".into(),
                time_sent: at(0),
            },
            Message {
                user_id: ids[0],
                sender: Sender::Support,
                sender_name: Some("Sato".into()),
                text: "どうぞ".into(),
                time_sent: at(2),
            },
        ])
        .await
        .unwrap();

    let config = AnalysisConfig {
        output_dir: dir.path().join("analysis_out").to_string_lossy().into_owned(),
        max_transcript_chars: 12_000,
    };
    let summary = build_dataset(&storage, "Sato", &config).await.unwrap();
    assert_eq!(summary.conversations, 2);
    assert!(summary.path.ends_with("conversations_Sato.jsonl"));

    let content = std::fs::read_to_string(&summary.path).unwrap();
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records[0]["line_name"], "a");
    assert_eq!(records[0]["response_metrics"]["median_sec"], 120.0);
    assert_eq!(records[1]["line_name"], "c");
    assert_eq!(records[1]["message_count"], 0);
    assert_eq!(records[1]["response_metrics"], serde_json::json!({"count": 0}));
    assert_eq!(records[1]["llm_text"], "");
}
