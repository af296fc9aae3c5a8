//! Engine services
//!
//! Typed operations over a [`TranslationStore`](crate::store::TranslationStore):
//! token extraction, project lifecycle and the save-translations
//! aggregator, and suggestion-driven auto-translation.

pub mod projects;
pub mod suggestions;
pub mod tokens;

pub use projects::{NewProject, ProjectService, ProjectUpdate, SelectedBooks};
pub use suggestions::{RebuildSummary, SuggestionService};
pub use tokens::{TokenDetail, TokenService, TokenTranslation};
