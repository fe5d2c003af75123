//! Draft editing with autosave.
//!
//! A [`DraftEditor`] owns the in-progress copy of one element. Each edit restarts the autosave
//! timer; when typing pauses the latest draft is saved into the session.

use crate::debounce::Debouncer;
use crate::model::GridDataElement;
use crate::session::{AlwaysConfirm, GridSession};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default pause before an edited draft is saved.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

pub struct DraftEditor {
    draft: Arc<Mutex<GridDataElement>>,
    autosave: Debouncer<GridDataElement>,
}

impl DraftEditor {
    pub fn new(session: Arc<Mutex<GridSession>>, element: GridDataElement) -> Self {
        Self::with_delay(session, element, AUTOSAVE_DELAY)
    }

    pub fn with_delay(
        session: Arc<Mutex<GridSession>>,
        element: GridDataElement,
        delay: Duration,
    ) -> Self {
        let draft = Arc::new(Mutex::new(element));
        let latest = Arc::clone(&draft);
        let autosave = Debouncer::new(
            delay,
            move || snapshot(&latest),
            move |element: GridDataElement| save(&session, element),
        );
        Self { draft, autosave }
    }

    /// Applies `change` to the draft and restarts the autosave timer.
    pub fn edit(&mut self, change: impl FnOnce(&mut GridDataElement)) {
        {
            let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut draft);
        }
        self.autosave.trigger();
    }

    pub fn draft(&self) -> GridDataElement {
        snapshot(&self.draft)
    }

    /// Saves a pending draft now.
    pub fn flush(&mut self) -> bool {
        self.autosave.flush()
    }

    /// Abandons unsaved edits.
    pub fn discard(&mut self) -> bool {
        self.autosave.cancel()
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.autosave.is_pending()
    }
}

fn snapshot(draft: &Mutex<GridDataElement>) -> GridDataElement {
    draft
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

// The editor owns this slot, so autosave never asks before overwriting it.
fn save(session: &Mutex<GridSession>, element: GridDataElement) {
    let location = element.location.clone();
    let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = session.save_element(element, &mut AlwaysConfirm) {
        tracing::error!(%location, error = %e, "autosave failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{GridStore, MemoryGridStore};

    fn setup() -> (Arc<MemoryGridStore>, Arc<Mutex<GridSession>>, GridDataElement) {
        let store = Arc::new(
            MemoryGridStore::with_grid(vec!["1".into()], vec![GridDataElement::blank("", "1")])
                .unwrap(),
        );
        let element = store.read().unwrap().element("1").unwrap().clone();
        let session = Arc::new(Mutex::new(GridSession::new(store.clone())));
        (store, session, element)
    }

    #[tokio::test(start_paused = true)]
    async fn saves_latest_draft_after_typing_pauses() {
        let (store, session, element) = setup();
        let mut editor = DraftEditor::with_delay(session, element, Duration::from_millis(300));

        editor.edit(|d| d.last_name = "D".into());
        tokio::time::sleep(Duration::from_millis(100)).await;
        editor.edit(|d| d.last_name = "Doe".into());
        assert!(editor.has_unsaved_edits());
        assert_eq!(store.read().unwrap().element("1").unwrap().last_name, "");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.read().unwrap().element("1").unwrap().last_name, "Doe");
        assert!(!editor.has_unsaved_edits());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately_and_discard_drops_edits() {
        let (store, session, element) = setup();
        let mut editor = DraftEditor::with_delay(session, element, Duration::from_millis(300));

        editor.edit(|d| d.team = "Renal".into());
        assert!(editor.flush());
        assert_eq!(store.read().unwrap().element("1").unwrap().team, "Renal");

        editor.edit(|d| d.team = "Cardiology".into());
        assert!(editor.discard());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.read().unwrap().element("1").unwrap().team, "Renal");
        assert_eq!(editor.draft().team, "Cardiology");
    }
}
