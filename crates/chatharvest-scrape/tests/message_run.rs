// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message-run behavior against a real SQLite store and a fake browser.

use std::path::Path;
use std::sync::Arc;

use chatharvest_config::model::{HarvestConfig, StorageConfig};
use chatharvest_core::{GateDecision, NewUser, Sender, StorageAdapter};
use chatharvest_scrape::{Checkpoint, Harvester, ProgressEvent, ProgressSink, RunOutcome};
use chatharvest_storage::SqliteStorage;
use chatharvest_test_utils::{ChatPage, MockBrowser, MockSessionFactory, ScriptedGate};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const BASE: &str = "https://crm.example";

fn page_url(id: i64) -> String {
    format!("{BASE}/basic/friendlist/my_page/{id}")
}

fn chat_page() -> String {
    ChatPage::new()
        .agent("Sato")
        .profile("性別", "女性")
        .date("2025年04月02日(水)")
        .customer("hi", "09:00")
        .support("hello", "09:05", None)
        .date("2025年04月03日(木)")
        .customer("bye", "10:00")
        .build()
}

struct Fixture {
    dir: TempDir,
    storage: Arc<SqliteStorage>,
    config: HarvestConfig,
}

impl Fixture {
    async fn with_users(count: i64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("harvest.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        for i in 1..=count {
            storage
                .insert_user(&NewUser {
                    line_name: format!("user {i}"),
                    href: format!("/basic/friendlist/my_page/{i}"),
                    friend_registered_at: None,
                    support: None,
                })
                .await
                .unwrap();
        }

        let mut config = HarvestConfig::default();
        config.crm.base_url = BASE.to_string();
        config.scrape.checkpoint_path = checkpoint_path(dir.path());
        Self {
            dir,
            storage,
            config,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(checkpoint_path(self.dir.path()))
    }

    fn harvester(&self, browsers: Vec<MockBrowser>, gate: Arc<ScriptedGate>) -> Harvester {
        Harvester::new(
            &self.config,
            self.storage.clone(),
            Arc::new(MockSessionFactory::new(browsers)),
            gate,
        )
    }
}

fn checkpoint_path(dir: &Path) -> String {
    dir.join("last_user_id.txt").to_string_lossy().into_owned()
}

#[tokio::test(start_paused = true)]
async fn transcripts_are_stored_in_document_order() {
    let fx = Fixture::with_users(1).await;
    let browser = MockBrowser::new().with_page(page_url(1), chat_page());
    let gate = Arc::new(ScriptedGate::always_proceed(1));

    let outcome = fx.harvester(vec![browser], gate).scrape_messages().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 1,
            skipped: 0
        }
    );

    let stored = fx.storage.messages_for_user(1).await.unwrap();
    let rows: Vec<_> = stored
        .iter()
        .map(|m| {
            (
                m.message.sender,
                m.message.text.as_str(),
                m.message.time_sent_text(),
                m.message.sender_name.clone(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (Sender::Customer, "hi", "2025-04-02 09:00:00".to_string(), None),
            (
                Sender::Support,
                "hello",
                "2025-04-02 09:05:00".to_string(),
                Some("Sato".to_string())
            ),
            (Sender::Customer, "bye", "2025-04-03 10:00:00".to_string(), None),
        ]
    );

    let user = fx.storage.get_user(1).await.unwrap().unwrap();
    assert_eq!(user.friend_value.as_deref(), Some(r#"{"性別":"女性"}"#));
    assert!(!fx.checkpoint().path().exists());
}

#[tokio::test(start_paused = true)]
async fn resume_skips_users_up_to_the_checkpoint() {
    let fx = Fixture::with_users(44).await;
    fx.checkpoint().advance(42).unwrap();

    let browser = MockBrowser::new()
        .with_page(page_url(43), chat_page())
        .with_page(page_url(44), chat_page());
    let gate = Arc::new(ScriptedGate::always_proceed(1));

    let outcome = fx
        .harvester(vec![browser.clone()], gate)
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 2,
            skipped: 0
        }
    );

    let visited = browser.visited();
    assert_eq!(&visited[1..], &[page_url(43), page_url(44)]);
    assert!(fx.storage.messages_for_user(42).await.unwrap().is_empty());
    assert_eq!(fx.storage.messages_for_user(43).await.unwrap().len(), 3);
    assert_eq!(fx.storage.messages_for_user(44).await.unwrap().len(), 3);
    assert!(!fx.checkpoint().path().exists());
}

#[tokio::test(start_paused = true)]
async fn cancel_at_relogin_stops_the_run_and_keeps_progress() {
    let fx = Fixture::with_users(3).await;
    let first = MockBrowser::new()
        .with_page(page_url(1), chat_page())
        .failing_on(page_url(2));
    let replacement = MockBrowser::new();
    let gate = Arc::new(ScriptedGate::new([
        GateDecision::Proceed,
        GateDecision::Cancel,
    ]));

    let outcome = fx
        .harvester(vec![first.clone(), replacement.clone()], gate.clone())
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            last_completed: Some(1)
        }
    );

    assert_eq!(fx.storage.messages_for_user(1).await.unwrap().len(), 3);
    assert!(!first.visited().contains(&page_url(3)));
    assert!(!replacement.visited().contains(&page_url(3)));
    assert!(replacement.is_shut_down());
    assert_eq!(fx.checkpoint().load().unwrap(), Some(1));
    assert_eq!(gate.prompts()[1].title, "Re-login required");
}

#[tokio::test(start_paused = true)]
async fn relogin_swaps_browser_and_retries_navigation() {
    let fx = Fixture::with_users(3).await;
    let first = MockBrowser::new()
        .with_page(page_url(1), chat_page())
        .failing_on(page_url(2));
    let replacement = MockBrowser::new()
        .with_page(page_url(2), chat_page())
        .with_page(page_url(3), chat_page());
    let gate = Arc::new(ScriptedGate::always_proceed(2));

    let outcome = fx
        .harvester(vec![first.clone(), replacement.clone()], gate)
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 3,
            skipped: 0
        }
    );
    assert!(first.is_shut_down());
    assert!(replacement.visited().contains(&page_url(2)));
    assert_eq!(fx.storage.count_messages().await.unwrap(), 9);
}

#[tokio::test(start_paused = true)]
async fn failed_retry_skips_only_that_user() {
    let fx = Fixture::with_users(3).await;
    let first = MockBrowser::new()
        .with_page(page_url(1), chat_page())
        .failing_on(page_url(2));
    let replacement = MockBrowser::new()
        .failing_on(page_url(2))
        .with_page(page_url(3), chat_page());
    let gate = Arc::new(ScriptedGate::always_proceed(2));

    let outcome = fx
        .harvester(vec![first, replacement], gate)
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 2,
            skipped: 1
        }
    );
    assert!(fx.storage.messages_for_user(2).await.unwrap().is_empty());
    assert_eq!(fx.storage.messages_for_user(3).await.unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn missing_chat_button_stores_empty_profile_and_moves_on() {
    let fx = Fixture::with_users(2).await;
    let browser = MockBrowser::new()
        .with_page(page_url(1), ChatPage::new().without_chat_button().build())
        .with_page(page_url(2), chat_page());
    let gate = Arc::new(ScriptedGate::always_proceed(1));

    let outcome = fx.harvester(vec![browser], gate).scrape_messages().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 1,
            skipped: 1
        }
    );
    let user = fx.storage.get_user(1).await.unwrap().unwrap();
    assert_eq!(user.friend_value.as_deref(), Some("{}"));
    assert!(fx.storage.messages_for_user(1).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn profile_timeout_is_empty_data_not_a_skip() {
    let fx = Fixture::with_users(1).await;
    let page = ChatPage::new()
        .date("2025年04月02日(水)")
        .customer("no profile panel here", "11:30")
        .build();
    let browser = MockBrowser::new().with_page(page_url(1), page);
    let gate = Arc::new(ScriptedGate::always_proceed(1));

    let outcome = fx.harvester(vec![browser], gate).scrape_messages().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 1,
            skipped: 0
        }
    );
    let user = fx.storage.get_user(1).await.unwrap().unwrap();
    assert_eq!(user.friend_value.as_deref(), Some("{}"));
    assert_eq!(fx.storage.messages_for_user(1).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn undated_messages_are_dropped_and_reported() {
    let fx = Fixture::with_users(1).await;
    let page = ChatPage::new()
        .profile("性別", "男性")
        .customer("before any header", "08:00")
        .date("2025年04月02日(水)")
        .customer("dated", "09:00")
        .build();
    let browser = MockBrowser::new().with_page(page_url(1), page);
    let gate = Arc::new(ScriptedGate::always_proceed(1));
    let (sink, mut rx) = ProgressSink::channel();

    fx.harvester(vec![browser], gate)
        .with_progress(sink)
        .scrape_messages()
        .await
        .unwrap();

    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::UserCompleted { stored, dropped, .. } = event {
            completed = Some((stored, dropped));
        }
    }
    assert_eq!(completed, Some((1, 1)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_at_the_user_boundary() {
    let fx = Fixture::with_users(2).await;
    let browser = MockBrowser::new();
    let gate = Arc::new(ScriptedGate::always_proceed(1));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = fx
        .harvester(vec![browser.clone()], gate)
        .with_cancellation(cancel)
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            last_completed: None
        }
    );
    assert_eq!(browser.visited().len(), 1, "only the login page");
    assert!(fx.checkpoint().path().exists());
    assert!(browser.is_shut_down());
}

#[tokio::test(start_paused = true)]
async fn cancel_at_first_login_touches_nothing() {
    let fx = Fixture::with_users(1).await;
    let gate = Arc::new(ScriptedGate::new([GateDecision::Cancel]));

    let outcome = fx
        .harvester(vec![MockBrowser::new()], gate)
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            last_completed: None
        }
    );
    assert!(!fx.checkpoint().path().exists());
}

#[tokio::test(start_paused = true)]
async fn rerunning_a_stored_user_keeps_one_transcript() {
    let fx = Fixture::with_users(2).await;
    let browser = MockBrowser::new()
        .with_page(page_url(1), chat_page())
        .with_page(page_url(2), chat_page());
    fx.harvester(vec![browser], Arc::new(ScriptedGate::always_proceed(1)))
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(fx.storage.messages_for_user(2).await.unwrap().len(), 3);

    // User 2 was stored but the checkpoint never moved past user 1.
    fx.checkpoint().advance(1).unwrap();
    let browser = MockBrowser::new().with_page(page_url(2), chat_page());
    let outcome = fx
        .harvester(vec![browser.clone()], Arc::new(ScriptedGate::always_proceed(1)))
        .scrape_messages()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            processed: 1,
            skipped: 0
        }
    );
    assert_eq!(&browser.visited()[1..], &[page_url(2)]);
    assert_eq!(fx.storage.messages_for_user(2).await.unwrap().len(), 3);
    assert_eq!(fx.storage.count_messages().await.unwrap(), 6);
}

#[tokio::test(start_paused = true)]
async fn page_agent_comes_from_the_page_before_scrolling() {
    let fx = Fixture::with_users(1).await;
    let opened = ChatPage::new()
        .agent("Sato")
        .profile("性別", "女性")
        .date("2025年04月02日(水)")
        .support("newest", "10:00", None)
        .build();
    // Older history carries its own staff label and no page-level agent.
    let scrolled = ChatPage::new()
        .profile("性別", "女性")
        .date("2025年04月01日(火)")
        .support("oldest", "09:00", Some("Kato"))
        .date("2025年04月02日(水)")
        .support("newest", "10:00", None)
        .build();
    let browser = MockBrowser::new()
        .with_page(page_url(1), opened)
        .on_script(scrolled);

    fx.harvester(vec![browser], Arc::new(ScriptedGate::always_proceed(1)))
        .scrape_messages()
        .await
        .unwrap();

    let names: Vec<(String, Option<String>)> = fx
        .storage
        .messages_for_user(1)
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.message.text, m.message.sender_name))
        .collect();
    assert_eq!(
        names,
        vec![
            ("oldest".to_string(), Some("Kato".to_string())),
            ("newest".to_string(), Some("Sato".to_string())),
        ]
    );
}
