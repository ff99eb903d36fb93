//! Goal images. Stored under the goals directory with a random name; the
//! database releases the file through the storage hook when a goal is
//! deleted or its image replaced.

use tracing::{info_span, warn};

use crate::db::goal_repo::{self, GoalRow, NewGoal};
use crate::error::{NotFoundError, Result};
use crate::processor;
use crate::storage::filesystem::join_relative;
use crate::storage::MediaStorage;

use super::runner::Pipeline;

impl Pipeline {
    /// Stores `content` as a goal image and creates the goal.
    pub fn create_goal(&self, goal: &NewGoal, filename: &str, content: &[u8]) -> Result<GoalRow> {
        let _span = info_span!("pipeline.create_goal").entered();

        let image_path = self.store_goal_image(filename, content)?;
        match goal_repo::insert(&self.db, goal, &image_path) {
            Ok(goal) => Ok(goal),
            Err(e) => {
                self.storage.remove_if_exists(&image_path)?;
                Err(e.into())
            }
        }
    }

    /// Stores a new image for the goal; the old file is released once the
    /// row points at the new one. If the row cannot be updated the new file
    /// is removed again.
    pub fn replace_goal_image(&self, goal_id: i64, filename: &str, content: &[u8]) -> Result<GoalRow> {
        let _span = info_span!("pipeline.replace_goal_image", goal_id).entered();

        if goal_repo::find_by_id(&self.db, goal_id)?.is_none() {
            return Err(NotFoundError::Goal(goal_id).into());
        }
        let image_path = self.store_goal_image(filename, content)?;
        let result: Result<GoalRow> = match goal_repo::replace_image(&self.db, goal_id, &image_path) {
            Ok(Some(goal)) => return Ok(goal),
            Ok(None) => Err(NotFoundError::Goal(goal_id).into()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = self.storage.remove_if_exists(&image_path) {
            warn!("Failed to remove unused goal image {}: {}", image_path, e);
        }
        result
    }

    pub fn delete_goal(&self, goal_id: i64) -> Result<()> {
        if !goal_repo::delete(&self.db, goal_id)? {
            return Err(NotFoundError::Goal(goal_id).into());
        }
        Ok(())
    }

    fn store_goal_image(&self, filename: &str, content: &[u8]) -> Result<String> {
        let extension = processor::extension_of(filename);
        let name = MediaStorage::random_name(extension.as_deref());
        let image_path = join_relative(&self.config.goals_directory, &name);
        self.storage.write(&image_path, content)?;
        Ok(image_path)
    }
}
