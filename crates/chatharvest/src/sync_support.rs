// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatharvest sync-support`: copy agent assignments from the sheet export
//! into `users.support`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chatharvest_config::HarvestConfig;
use chatharvest_core::{HarvestError, StorageAdapter};
use tracing::{info, warn};

use crate::commands::open_storage;

/// Column of the agent name, counted from the LINE name column.
const SUPPORT_COLUMN: usize = 4;

/// Name-to-agent pairs from CSV rows. Blank names or agents are skipped, and
/// a later row for the same name wins.
pub fn support_mapping_from_csv(
    reader: impl Read,
    has_header: bool,
) -> Result<Vec<(String, String)>, csv::Error> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(reader);

    let mut mapping = BTreeMap::new();
    for record in csv.records() {
        let record = record?;
        let name = record.get(0).unwrap_or("").trim();
        let support = record.get(SUPPORT_COLUMN).unwrap_or("").trim();
        if name.is_empty() || support.is_empty() {
            continue;
        }
        mapping.insert(name.to_string(), support.to_string());
    }
    Ok(mapping.into_iter().collect())
}

pub async fn run_sync_support(
    config: &HarvestConfig,
    csv_path: &Path,
    has_header: bool,
) -> Result<(), HarvestError> {
    let file = std::fs::File::open(csv_path).map_err(|e| {
        HarvestError::Config(format!("cannot open {}: {e}", csv_path.display()))
    })?;
    let mapping = support_mapping_from_csv(file, has_header).map_err(|e| {
        HarvestError::Config(format!("cannot read {}: {e}", csv_path.display()))
    })?;
    if mapping.is_empty() {
        warn!(path = %csv_path.display(), "no name/agent pairs found");
    }

    let storage = open_storage(config).await?;
    let report = storage.apply_support_assignments(&mapping).await?;
    storage.close().await?;

    info!(
        mapped = mapping.len(),
        updated = report.updated,
        total = report.total,
        "support assignments applied"
    );
    println!(
        "updated {} of {} users from {} sheet rows",
        report.updated,
        report.total,
        mapping.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_first_agent_fifth() {
        let csv = "\
Alice,x,y,z,Sato
 Bob ,,,, Kato
,,,,Orphan
Chie,,,,
Dan,short
Alice,,,,Ito
";
        let mapping = support_mapping_from_csv(csv.as_bytes(), false).unwrap();
        assert_eq!(
            mapping,
            vec![
                ("Alice".to_string(), "Ito".to_string()),
                ("Bob".to_string(), "Kato".to_string()),
            ]
        );
    }

    #[test]
    fn header_row_is_skipped_when_asked() {
        let csv = "LINE名,a,b,c,担当\nAlice,,,,Sato\n";
        let mapping = support_mapping_from_csv(csv.as_bytes(), true).unwrap();
        assert_eq!(mapping, vec![("Alice".to_string(), "Sato".to_string())]);
    }

    #[tokio::test]
    async fn assignments_reach_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("sheet.csv");
        std::fs::write(&csv_path, "Alice,,,,Sato\nNobody,,,,Kato\n").unwrap();

        let mut config = chatharvest_config::load_and_validate_str("").unwrap();
        config.storage.database_path = dir.path().join("h.db").to_string_lossy().into_owned();

        let storage = open_storage(&config).await.unwrap();
        storage
            .insert_user(&chatharvest_core::NewUser {
                line_name: "Alice".into(),
                href: "/basic/friendlist/my_page/1".into(),
                friend_registered_at: None,
                support: None,
            })
            .await
            .unwrap();
        storage.close().await.unwrap();

        run_sync_support(&config, &csv_path, false).await.unwrap();

        let storage = open_storage(&config).await.unwrap();
        let users = storage.list_users().await.unwrap();
        assert_eq!(users[0].support.as_deref(), Some("Sato"));
    }
}
