use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

use crate::dictionary::{DictionaryRow, GLOSS_TABLE, GlossDictionary};
use crate::models::{Outcome, RecordResult, SyncReport};
use crate::naming::{canonical_file_name, object_key, strip_mp4_suffix};
use crate::store::VideoStore;

/// The object move and database update needed to bring one row in line
/// with its gloss label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRename {
    pub id: i64,
    pub original_name: String,
    pub new_name: String,
    pub source_key: String,
    pub target_key: String,
}

impl VideoRename {
    pub fn new(id: i64, original_name: &str, label: &str) -> Self {
        let new_name = canonical_file_name(label);

        Self {
            id,
            source_key: object_key(original_name),
            target_key: object_key(&new_name),
            original_name: original_name.to_string(),
            new_name,
        }
    }
}

/// Decides what a row needs without touching the store or the database.
/// `Ok` carries the rename to perform, `Err` the skip outcome.
pub fn plan_row(row: &DictionaryRow) -> std::result::Result<VideoRename, Outcome> {
    let Some(file_name) = row.video_file_name.as_deref() else {
        return Err(Outcome::SkippedNoFileName);
    };

    if row.text == strip_mp4_suffix(file_name) {
        return Err(Outcome::SkippedAlreadyMatching);
    }

    Ok(VideoRename::new(row.id, file_name, &row.text))
}

/// Renames gloss videos in the bucket to match their dictionary labels.
pub struct Synchronizer<S, D> {
    store: S,
    dictionary: D,
}

impl<S: VideoStore, D: GlossDictionary> Synchronizer<S, D> {
    pub fn new(store: S, dictionary: D) -> Self {
        Self { store, dictionary }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dictionary(&self) -> &D {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut D {
        &mut self.dictionary
    }

    pub fn into_parts(self) -> (S, D) {
        (self.store, self.dictionary)
    }

    /// One pass over the current table. Row failures are logged and
    /// counted; only a failure to read the table is returned as an error.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        info!(bucket = self.store.bucket(), "Getting all records from {}", GLOSS_TABLE);
        let rows = self.dictionary.fetch_all().await?;
        info!(count = rows.len(), "Rows Count: {}", rows.len());

        let mut report = SyncReport::default();

        for row in &rows {
            let outcome = self.process_row(row).await;
            report.push(RecordResult {
                id: row.id,
                video_file_name: row.video_file_name.clone(),
                outcome,
            });
        }

        Ok(report)
    }

    async fn process_row(&mut self, row: &DictionaryRow) -> Outcome {
        let file_name = row.video_file_name.as_deref().unwrap_or_default();

        match plan_row(row) {
            Err(Outcome::SkippedNoFileName) => {
                info!(id = row.id, "Skipping record as no video file name is set");
                Outcome::SkippedNoFileName
            }
            Err(skip) => {
                info!(id = row.id, "✓ Skipping record: {}", file_name);
                skip
            }
            Ok(rename) => {
                let outcome = self.process_record(&rename).await;
                match &outcome {
                    Outcome::Succeeded => info!(id = row.id, "✓ Successfully processed {}", file_name),
                    _ => warn!(id = row.id, "⚠ Skipping record: {}", file_name),
                }
                outcome
            }
        }
    }

    /// Moves one video to its canonical key and records the new name.
    /// Never returns an error: any failing step yields `Outcome::Failed`
    /// and whatever that step left behind stays as it is.
    pub async fn process_record(&mut self, rename: &VideoRename) -> Outcome {
        match self.rename_video(rename).await {
            Ok(()) => Outcome::Succeeded,
            Err(e) => {
                error!(id = rename.id, "✗ Failed processing {}: {:#}", rename.original_name, e);
                Outcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn rename_video(&mut self, rename: &VideoRename) -> Result<()> {
        let source_key = rename.source_key.as_str();
        let target_key = rename.target_key.as_str();

        info!(id = rename.id, "Source key: {}", source_key);
        info!(id = rename.id, "Target key: {}", target_key);

        let source_exists = self.store
            .object_exists(source_key)
            .await
            .with_context(|| format!("Source file missing: {}", source_key))?;
        if !source_exists {
            bail!("Source file missing: {}", source_key);
        }
        info!("✓ Source file exists: {}", source_key);

        self.store.copy_object(source_key, target_key).await?;
        info!("✓ Copied to: {}", target_key);

        // The original is only removed once the copy is confirmed
        let copy_exists = self.store
            .object_exists(target_key)
            .await
            .with_context(|| format!("Could not verify copy at {}", target_key))?;
        if !copy_exists {
            bail!("Copy not found at {}; keeping {}", target_key, source_key);
        }
        info!("✓ Verified copy exists");

        self.store.delete_object(source_key).await?;
        info!("✓ Deleted original: {}", source_key);

        self.dictionary
            .update_video_file_name(rename.id, &rename.new_name)
            .await?;
        info!("✓ Successfully updated record {}", rename.id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_row_without_file_name() {
        let row = DictionaryRow::new(1, "HELLO", None);
        assert_eq!(plan_row(&row), Err(Outcome::SkippedNoFileName));
    }

    #[test]
    fn test_plan_row_already_matching() {
        let row = DictionaryRow::new(1, "HELLO", Some("HELLO.mp4"));
        assert_eq!(plan_row(&row), Err(Outcome::SkippedAlreadyMatching));

        // no extension at all still counts as matching the label
        let row = DictionaryRow::new(2, "HELLO", Some("HELLO"));
        assert_eq!(plan_row(&row), Err(Outcome::SkippedAlreadyMatching));
    }

    #[test]
    fn test_plan_row_mismatch() {
        let row = DictionaryRow::new(7, "HELLO", Some("hello_old.mp4"));
        let rename = plan_row(&row).unwrap();

        assert_eq!(rename.id, 7);
        assert_eq!(rename.original_name, "hello_old.mp4");
        assert_eq!(rename.new_name, "HELLO.mp4");
        assert_eq!(rename.source_key, "inputs/Data_Videos/hello_old.mp4");
        assert_eq!(rename.target_key, "inputs/Data_Videos/HELLO.mp4");
    }

    #[test]
    fn test_plan_row_mid_string_mp4_is_not_stripped() {
        // "HI.mp4x" would collapse to "HIx" with a blind replace
        let row = DictionaryRow::new(3, "HIx", Some("HI.mp4x"));
        let rename = plan_row(&row).unwrap();
        assert_eq!(rename.new_name, "HIx.mp4");
    }

    #[test]
    fn test_plan_row_is_case_sensitive() {
        let row = DictionaryRow::new(4, "HELLO", Some("hello.mp4"));
        assert!(plan_row(&row).is_ok());
    }
}
