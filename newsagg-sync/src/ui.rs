//! View state that lives only as long as the process.

use newsagg_client::ArticleQuery;
use newsagg_core::EntityId;

/// State of the add/edit source dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceModal {
    #[default]
    Closed,
    Create,
    Edit(EntityId),
}

impl SourceModal {
    pub fn is_open(&self) -> bool {
        !matches!(self, SourceModal::Closed)
    }

    pub fn editing(&self) -> Option<EntityId> {
        match self {
            SourceModal::Edit(id) => Some(*id),
            _ => None,
        }
    }
}

/// Non-persisted UI selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub selected_category: Option<String>,
    pub search_query: String,
    pub source_modal: SourceModal,
    pub delete_confirmation: Option<EntityId>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_category(&mut self, category: Option<String>) {
        self.selected_category = category;
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Open the source dialog, editing `id` when given.
    pub fn open_source_modal(&mut self, id: Option<EntityId>) {
        self.source_modal = match id {
            Some(id) => SourceModal::Edit(id),
            None => SourceModal::Create,
        };
    }

    pub fn close_source_modal(&mut self) {
        self.source_modal = SourceModal::Closed;
    }

    pub fn open_delete_confirmation(&mut self, id: EntityId) {
        self.delete_confirmation = Some(id);
    }

    pub fn close_delete_confirmation(&mut self) {
        self.delete_confirmation = None;
    }

    /// Article listing filters for `page` under the current selections.
    pub fn article_query(&self, page: u32, size: u32) -> ArticleQuery {
        let mut query = ArticleQuery::new().page(page).size(size);
        if let Some(category) = &self.selected_category {
            query = query.category(category.clone());
        }
        if !self.search_query.trim().is_empty() {
            query = query.search(self.search_query.trim());
        }
        query
    }
}
