use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Failure,
}

/// A short message meant for the person who triggered an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn success(title: &str, message: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    fn failure(title: &str, message: String) -> Self {
        Self {
            kind: NoticeKind::Failure,
            title: title.into(),
            message,
        }
    }

    pub fn recipe_saved() -> Self {
        Self::success("Recipe saved!", "Your recipe has been successfully saved.")
    }

    pub fn recipe_unsaved() -> Self {
        Self::success(
            "Recipe unsaved!",
            "Your recipe has been successfully removed from saved recipes.",
        )
    }

    pub fn saved_update_failed(err: &AppError) -> Self {
        Self::failure(
            "Failed to update saved recipes",
            format!("An error occurred while updating your saved recipes: {err}"),
        )
    }

    pub fn recipe_created() -> Self {
        Self::success("Recipe added!", "Your recipe has been successfully added.")
    }

    pub fn recipe_create_failed(err: &AppError) -> Self {
        Self::failure(
            "Failed to save recipe",
            format!("An error occurred while saving the recipe: {err}"),
        )
    }

    /// Notice for the outcome of a save toggle.
    pub fn for_toggle(result: &Result<bool, AppError>) -> Self {
        match result {
            Ok(true) => Self::recipe_saved(),
            Ok(false) => Self::recipe_unsaved(),
            Err(e) => Self::saved_update_failed(e),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Success => info!(title = %notice.title, "{}", notice.message),
            NoticeKind::Failure => warn!(title = %notice.title, "{}", notice.message),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_notices() {
        assert_eq!(Notice::for_toggle(&Ok(true)).title, "Recipe saved!");
        assert_eq!(Notice::for_toggle(&Ok(false)).title, "Recipe unsaved!");

        let failed = Notice::for_toggle(&Err(AppError::write(
            "users/u/savedRecipes/r",
            None,
            "permission denied",
        )));
        assert_eq!(failed.kind, NoticeKind::Failure);
        assert!(failed.message.contains("permission denied"));
    }

    #[test]
    fn serializes_kind_in_lowercase() {
        let json = serde_json::to_value(Notice::recipe_saved()).unwrap();
        assert_eq!(json["kind"], "success");
    }
}
