use viewgate_core::{schema::View, Selector};

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

/// Per-request holder of per-view selector state.
///
/// A selector is created on first access and lives for the session; the
/// population phase mutates it through [`Session::update`], the read
/// phase snapshots it. Keyed by view name.
#[derive(Debug, Default)]
pub struct Session {
    selectors: Mutex<HashMap<String, Selector>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the view's selector, creating it on first access.
    pub fn update(&self, view: &View, f: impl FnOnce(&mut Selector)) {
        let mut selectors = self.lock();
        let selector = selectors.entry(view.name.clone()).or_default();
        f(selector);
    }

    /// Snapshot of the view's selector as populated so far.
    pub fn statelet(&self, view: &View) -> Selector {
        self.lock().entry(view.name.clone()).or_default().clone()
    }

    /// Mark the view's subtree as skipped for this request.
    pub fn ignore(&self, view: &View) {
        self.update(view, |selector| selector.ignored = true);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Selector>> {
        self.selectors.lock().expect("session poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statelet_is_stable_across_accesses() {
        let session = Session::new();
        let view = View::new("events", "events");

        session.update(&view, |s| s.limit = Some(5));
        assert_eq!(session.statelet(&view).limit, Some(5));

        // A later access sees the same state, not a fresh selector.
        session.update(&view, |s| s.offset = Some(1));
        let statelet = session.statelet(&view);
        assert_eq!(statelet.limit, Some(5));
        assert_eq!(statelet.offset, Some(1));
    }

    #[test]
    fn ignore_marks_the_view() {
        let session = Session::new();
        let view = View::new("events", "events");

        assert!(!session.statelet(&view).ignored);
        session.ignore(&view);
        assert!(session.statelet(&view).ignored);
    }
}
