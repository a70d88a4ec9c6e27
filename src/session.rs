use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::illustration::IllustrationRequest;
use crate::paginator::paginate;
use crate::render::{CharClass, RenderCell, RenderModel};
use crate::store::{progress_key, KvStore};

/// Persisted form of a session: `{"page": 0, "inputs": {"0": "..."}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

impl Snapshot {
    /// Read the snapshot for `key`. Anything missing or unreadable counts as
    /// no snapshot at all.
    pub fn restore(store: &dyn KvStore, key: &str) -> Option<Self> {
        let raw = match store.get(&progress_key(key)) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key, %err, "failed to read progress, starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(key, %err, "ignoring unreadable progress");
                None
            }
        }
    }
}

/// What a keystroke did to the session.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum TypeOutcome {
    /// The page was already fully typed.
    Ignored,
    Typed,
    /// The keystroke completed the page and moved to the next one.
    Advanced,
}

/// Whether the keystroke that brought a page to `typed_len` should move on.
pub fn completes_page(typed_len: usize, expected_len: usize, is_last_page: bool) -> bool {
    typed_len == expected_len && !is_last_page
}

/// Typing progress through one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    key: String,
    pages: Vec<String>,
    page_lens: Vec<usize>,
    current_page: usize,
    typed_by_page: BTreeMap<usize, String>,
}

impl Session {
    /// Paginate `text` and pick up wherever the last snapshot for `key` left off.
    pub fn load(store: &dyn KvStore, key: &str, text: &str, page_size: usize) -> Result<Self> {
        let pages = paginate(text, page_size);
        if pages.is_empty() {
            return Err(Error::EmptyText {
                key: key.to_string(),
            });
        }

        let mut session = Self::with_pages(key, pages);
        if let Some(snapshot) = Snapshot::restore(store, key) {
            session.apply_snapshot(snapshot);
        }

        debug!(
            key,
            pages = session.page_count(),
            page = session.current_page,
            "session loaded"
        );
        Ok(session)
    }

    fn with_pages(key: &str, pages: Vec<String>) -> Self {
        let page_lens = pages.iter().map(|p| p.chars().count()).collect();
        Self {
            key: key.to_string(),
            pages,
            page_lens,
            current_page: 0,
            typed_by_page: BTreeMap::new(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.current_page = snapshot.page.min(self.page_count() - 1);

        for (idx, typed) in snapshot.inputs {
            let Ok(idx) = idx.parse::<usize>() else {
                continue;
            };
            let Some(&expected_len) = self.page_lens.get(idx) else {
                continue;
            };
            let typed: String = typed.chars().take(expected_len).collect();
            if !typed.is_empty() {
                self.typed_by_page.insert(idx, typed);
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn typed_by_page(&self) -> &BTreeMap<usize, String> {
        &self.typed_by_page
    }

    pub fn expected(&self) -> &str {
        &self.pages[self.current_page]
    }

    pub fn typed(&self) -> &str {
        self.typed_by_page
            .get(&self.current_page)
            .map_or("", String::as_str)
    }

    fn expected_len(&self) -> usize {
        self.page_lens[self.current_page]
    }

    fn is_last_page(&self) -> bool {
        self.current_page + 1 == self.page_count()
    }

    /// Pages whose typed string is as long as the page.
    pub fn completed_pages(&self) -> usize {
        self.typed_by_page
            .iter()
            .filter(|(idx, typed)| typed.chars().count() == self.page_lens[**idx])
            .count()
    }

    pub fn type_char(&mut self, c: char) -> TypeOutcome {
        let expected_len = self.expected_len();
        let typed = self.typed_by_page.entry(self.current_page).or_default();
        let typed_len = typed.chars().count();
        if typed_len >= expected_len {
            return TypeOutcome::Ignored;
        }

        typed.push(c);

        if completes_page(typed_len + 1, expected_len, self.is_last_page()) {
            self.current_page += 1;
            debug!(key = %self.key, page = self.current_page, "page completed, advancing");
            TypeOutcome::Advanced
        } else {
            TypeOutcome::Typed
        }
    }

    /// Remove the last typed character of the current page. Returns false
    /// when there was nothing to remove.
    pub fn backspace(&mut self) -> bool {
        let Some(typed) = self.typed_by_page.get_mut(&self.current_page) else {
            return false;
        };
        let removed = typed.pop().is_some();
        if typed.is_empty() {
            self.typed_by_page.remove(&self.current_page);
        }
        removed
    }

    pub fn jump_to(&mut self, page_number: usize) -> Result<()> {
        if page_number == 0 || page_number > self.page_count() {
            return Err(Error::PageOutOfRange {
                requested: page_number,
                page_count: self.page_count(),
            });
        }
        self.current_page = page_number - 1;
        debug!(key = %self.key, page = self.current_page, "jumped");
        Ok(())
    }

    /// Forget everything typed for this text, on disk and in memory.
    pub fn reset(&mut self, store: &mut dyn KvStore) -> Result<()> {
        store.remove(&progress_key(&self.key))?;
        self.typed_by_page.clear();
        self.current_page = 0;
        debug!(key = %self.key, "progress reset");
        self.persist(store)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            page: self.current_page,
            inputs: self
                .typed_by_page
                .iter()
                .map(|(idx, typed)| (idx.to_string(), typed.clone()))
                .collect(),
        }
    }

    pub fn persist(&self, store: &mut dyn KvStore) -> Result<()> {
        let json = serde_json::to_string(&self.snapshot())?;
        store.set(&progress_key(&self.key), &json)
    }

    /// Classify every expected character of the current page. Pass the
    /// illustration base URL to also get the page's illustration request.
    pub fn render(&self, illustration_base_url: Option<&str>) -> RenderModel {
        let expected = self.expected();
        let mut typed = self.typed().chars();
        let mut typed_count = 0;
        let mut matched = 0;
        let mut active_placed = false;

        let cells = expected
            .chars()
            .map(|e| match typed.next() {
                Some(t) => {
                    typed_count += 1;
                    if t == e {
                        matched += 1;
                        RenderCell::new(e, CharClass::Matched)
                    } else {
                        RenderCell::new(e, CharClass::Mismatched)
                    }
                }
                None if !active_placed => {
                    active_placed = true;
                    RenderCell::new(e, CharClass::Active)
                }
                None => RenderCell::new(e, CharClass::Pending),
            })
            .collect();

        RenderModel {
            key: self.key.clone(),
            cells,
            typed_count,
            error_count: typed_count - matched,
            page_number: self.current_page + 1,
            page_count: self.page_count(),
            illustration: illustration_base_url
                .map(|base| IllustrationRequest::for_page(base, expected)),
        }
    }
}
