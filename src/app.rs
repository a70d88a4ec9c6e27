use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::illustration::{self, IllustrationRequest};
use crate::library::{self, TextEntry};
use crate::render::RenderModel;
use crate::session::{Session, TypeOutcome};
use crate::store::KvStore;

/// Ticks a footer notice stays up when no key dismisses it.
pub const NOTICE_TICKS: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    Home,
    Typing,
}

/// A pending question in the footer that captures keys until answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    None,
    GoToPage(String),
    ConfirmReset,
    ConfirmDelete(String),
}

pub struct App {
    pub store: Box<dyn KvStore>,
    pub config: Config,
    pub state: AppState,
    pub session: Option<Session>,
    pub entries: Vec<TextEntry>,
    pub selected: usize,
    pub prompt: Prompt,
    pub notice: Option<String>,
    notice_age: u32,
    pub should_quit: bool,
    open_illustration: fn(&IllustrationRequest),
}

impl App {
    pub fn new(store: Box<dyn KvStore>, config: Config) -> Self {
        let mut app = Self {
            store,
            config: config.sanitized(),
            state: AppState::Home,
            session: None,
            entries: Vec::new(),
            selected: 0,
            prompt: Prompt::None,
            notice: None,
            notice_age: 0,
            should_quit: false,
            open_illustration: illustration::open_in_browser,
        };
        app.refresh_library();
        app
    }

    /// Swap the browser launcher, e.g. for tests.
    pub fn with_illustration_opener(mut self, opener: fn(&IllustrationRequest)) -> Self {
        self.open_illustration = opener;
        self
    }

    pub fn refresh_library(&mut self) {
        match library::entries(&*self.store, self.config.page_size) {
            Ok(entries) => self.entries = entries,
            Err(err) => self.report(err),
        }
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }

    /// Show `err` in the footer; anything the user didn't cause also goes to the log.
    pub fn report(&mut self, err: Error) {
        if !err.is_user_notice() {
            warn!(%err, "operation failed");
        }
        self.notify(err.to_string());
    }

    fn notify(&mut self, message: String) {
        self.notice = Some(message);
        self.notice_age = 0;
    }

    /// Age the footer notice. Returns true when the screen needs a redraw.
    pub fn on_tick(&mut self) -> bool {
        if self.notice.is_none() {
            return false;
        }
        self.notice_age += 1;
        if self.notice_age < NOTICE_TICKS {
            return false;
        }
        self.notice = None;
        self.notice_age = 0;
        true
    }

    /// Save progress and stop the loop.
    pub fn quit(&mut self) {
        self.persist();
        self.should_quit = true;
    }

    pub fn render_model(&self) -> Option<RenderModel> {
        self.session
            .as_ref()
            .map(|s| s.render(self.config.illustration_base()))
    }

    /// Import a file into the library and start typing it.
    pub fn import_file(&mut self, path: &Path) -> Result<()> {
        let name = library::import_file(&mut *self.store, path)?;
        info!(name, "imported file");
        self.refresh_library();
        self.open(&name);
        Ok(())
    }

    /// Start typing the saved text `name`.
    pub fn open(&mut self, name: &str) {
        match library::load(&*self.store, name) {
            Ok(Some(text)) => self.start(name, &text),
            Ok(None) => self.notify(format!("\"{name}\" is no longer saved")),
            Err(err) => self.report(err),
        }
    }

    fn start(&mut self, key: &str, text: &str) {
        match Session::load(&*self.store, key, text, self.config.page_size) {
            Ok(session) => {
                self.session = Some(session);
                self.state = AppState::Typing;
                self.prompt = Prompt::None;
                self.persist();
                debug!(key, state = %self.state, "started typing");
            }
            Err(err) => self.report(err),
        }
    }

    fn persist(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if let Err(err) = session.persist(&mut *self.store) {
            self.report(err);
        }
    }

    fn go_home(&mut self) {
        self.persist();
        self.session = None;
        self.state = AppState::Home;
        self.prompt = Prompt::None;
        self.refresh_library();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if is_shortcut(&key) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        self.notice = None;

        if self.prompt != Prompt::None {
            self.on_prompt_key(key);
            return;
        }

        match self.state {
            AppState::Home => self.on_home_key(key),
            AppState::Typing => self.on_typing_key(key),
        }
    }

    fn on_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.entries.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(entry) = self.entries.get(self.selected) {
                    let name = entry.name.clone();
                    self.open(&name);
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.entries.get(self.selected) {
                    self.prompt = Prompt::ConfirmDelete(entry.name.clone());
                }
            }
            _ => {}
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent) {
        if is_shortcut(&key) {
            match key.code {
                KeyCode::Char('g') => self.prompt = Prompt::GoToPage(String::new()),
                KeyCode::Char('r') => self.prompt = Prompt::ConfirmReset,
                KeyCode::Char('o') => {
                    if let Some(request) = self.render_model().and_then(|m| m.illustration) {
                        (self.open_illustration)(&request);
                    }
                }
                _ => {}
            }
            return;
        }

        if key.code == KeyCode::Esc {
            self.go_home();
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        let changed = match key.code {
            KeyCode::Backspace => session.backspace(),
            KeyCode::Enter => session.type_char('\n') != TypeOutcome::Ignored,
            KeyCode::Tab => session.type_char('\t') != TypeOutcome::Ignored,
            // AltGr arrives as ctrl+alt and types; a bare alt chord does not
            KeyCode::Char(c) if !is_alt_chord(&key) => {
                session.type_char(c) != TypeOutcome::Ignored
            }
            _ => false,
        };

        if changed {
            self.persist();
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let prompt = std::mem::replace(&mut self.prompt, Prompt::None);
        match (prompt, key.code) {
            (_, KeyCode::Esc) => {}
            (Prompt::GoToPage(mut input), KeyCode::Char(c)) => {
                if c.is_ascii_digit() {
                    input.push(c);
                }
                self.prompt = Prompt::GoToPage(input);
            }
            (Prompt::GoToPage(mut input), KeyCode::Backspace) => {
                input.pop();
                self.prompt = Prompt::GoToPage(input);
            }
            (Prompt::GoToPage(input), KeyCode::Enter) => {
                self.jump_to(input.parse::<usize>().unwrap_or(0));
            }
            (Prompt::GoToPage(input), _) => self.prompt = Prompt::GoToPage(input),
            (Prompt::ConfirmReset, KeyCode::Char('y' | 'Y')) => self.reset(),
            (Prompt::ConfirmDelete(name), KeyCode::Char('y' | 'Y')) => {
                match library::remove(&mut *self.store, &name) {
                    Ok(()) => info!(name, "deleted text"),
                    Err(err) => self.report(err),
                }
                self.refresh_library();
            }
            // any other answer is a no
            _ => {}
        }
    }

    fn jump_to(&mut self, page_number: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.jump_to(page_number) {
            Ok(()) => self.persist(),
            Err(err) => self.report(err),
        }
    }

    fn reset(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(err) = session.reset(&mut *self.store) {
            self.report(err);
        }
    }
}

/// Ctrl chords without alt. Ctrl+alt is AltGr on Windows and types a character.
fn is_shortcut(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && !key.modifiers.contains(KeyModifiers::ALT)
}

fn is_alt_chord(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::ALT) && !key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    fn app_with(texts: &[(&str, &str)], page_size: usize) -> App {
        let mut store = MemoryStore::new();
        for (name, text) in texts {
            library::import(&mut store, name, text).unwrap();
        }
        let config = Config {
            page_size,
            ..Config::default()
        };
        App::new(Box::new(store), config).with_illustration_opener(|_| {})
    }

    #[test]
    fn test_new_app_lists_library() {
        let app = app_with(&[("b.txt", "bb"), ("a.txt", "aa")], 10);
        assert_eq!(app.state, AppState::Home);
        assert_eq!(app.entries.len(), 2);
        assert_eq!(app.entries[0].name, "a.txt");
    }

    #[test]
    fn test_open_and_type_persists_progress() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Typing);
        assert!(app.store.get("progress_a.txt").unwrap().is_some());

        type_str(&mut app, "ABX");
        let model = app.render_model().unwrap();
        assert_eq!(model.page_number, 2);
        assert_eq!(model.error_count, 1);

        let raw = app.store.get("progress_a.txt").unwrap().unwrap();
        assert_eq!(raw, r#"{"page":1,"inputs":{"0":"AB","1":"X"}}"#);
    }

    #[test]
    fn test_enter_and_tab_type_whitespace() {
        let mut app = app_with(&[("a.txt", "a\n\tb")], 10);
        app.open("a.txt");
        app.on_key(key(KeyCode::Char('a')));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Tab));
        let model = app.render_model().unwrap();
        assert_eq!(model.error_count, 0);
        assert_eq!(model.typed_count, 3);
    }

    #[test]
    fn test_empty_text_shows_notice_and_stays_home() {
        let mut app = app_with(&[("empty.txt", "")], 10);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Home);
        assert!(app.session.is_none());
        assert!(app.notice.as_deref().unwrap().contains("empty.txt"));
        assert!(app.store.get("progress_empty.txt").unwrap().is_none());
    }

    #[test]
    fn test_go_to_page_prompt() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");

        app.on_key(ctrl('g'));
        assert_eq!(app.prompt, Prompt::GoToPage(String::new()));
        type_str(&mut app, "3");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.prompt, Prompt::None);
        assert_eq!(app.session.as_ref().unwrap().current_page(), 2);
        assert!(app.notice.is_none());
        assert_eq!(
            app.store.get("progress_a.txt").unwrap().as_deref(),
            Some(r#"{"page":2,"inputs":{}}"#)
        );
    }

    #[test]
    fn test_backspace_persists_progress() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 3);
        app.open("a.txt");
        type_str(&mut app, "ABCDX");
        app.on_key(key(KeyCode::Backspace));
        assert_eq!(
            app.store.get("progress_a.txt").unwrap().as_deref(),
            Some(r#"{"page":1,"inputs":{"0":"ABC","1":"D"}}"#)
        );

        app.on_key(key(KeyCode::Backspace));
        assert_eq!(
            app.store.get("progress_a.txt").unwrap().as_deref(),
            Some(r#"{"page":1,"inputs":{"0":"ABC"}}"#)
        );
    }

    #[test]
    fn test_altgr_characters_type_and_alt_chords_do_not() {
        let mut app = app_with(&[("mail.txt", "a@b{")], 10);
        app.open("mail.txt");

        let altgr = KeyModifiers::CONTROL | KeyModifiers::ALT;
        app.on_key(key(KeyCode::Char('a')));
        app.on_key(KeyEvent::new(KeyCode::Char('@'), altgr));
        app.on_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        app.on_key(key(KeyCode::Char('b')));
        app.on_key(KeyEvent::new(KeyCode::Char('{'), altgr));

        let model = app.render_model().unwrap();
        assert_eq!(model.typed_count, 4);
        assert_eq!(model.error_count, 0);
        assert_eq!(app.prompt, Prompt::None);
        assert!(!app.should_quit);

        // ctrl on its own still reaches the shortcuts
        app.on_key(ctrl('g'));
        assert_eq!(app.prompt, Prompt::GoToPage(String::new()));
    }

    #[test]
    fn test_notice_expires_after_ticks() {
        let mut app = app_with(&[("empty.txt", "")], 10);
        assert!(!app.on_tick());

        app.on_key(key(KeyCode::Enter));
        assert!(app.notice.is_some());
        for _ in 1..NOTICE_TICKS {
            assert!(!app.on_tick());
        }
        assert!(app.notice.is_some());
        assert!(app.on_tick());
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_quit_saves_progress() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");
        type_str(&mut app, "A");
        app.store.remove("progress_a.txt").unwrap();

        app.quit();
        assert!(app.should_quit);
        assert_eq!(
            app.store.get("progress_a.txt").unwrap().as_deref(),
            Some(r#"{"page":0,"inputs":{"0":"A"}}"#)
        );
    }

    #[test]
    fn test_go_to_page_out_of_range_keeps_page() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");

        app.on_key(ctrl('g'));
        type_str(&mut app, "5");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.as_ref().unwrap().current_page(), 0);
        assert_eq!(
            app.notice.as_deref(),
            Some("enter a page number from 1 to 3")
        );

        // the notice goes away with the next key
        app.on_key(key(KeyCode::Char('A')));
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_go_to_page_ignores_non_digits_and_cancels() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");

        app.on_key(ctrl('g'));
        type_str(&mut app, "x2y");
        assert_eq!(app.prompt, Prompt::GoToPage("2".into()));
        app.on_key(key(KeyCode::Backspace));
        assert_eq!(app.prompt, Prompt::GoToPage(String::new()));
        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.prompt, Prompt::None);
        assert_eq!(app.state, AppState::Typing);
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");
        type_str(&mut app, "ABC");

        app.on_key(ctrl('r'));
        app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.session.as_ref().unwrap().current_page(), 1);

        app.on_key(ctrl('r'));
        app.on_key(key(KeyCode::Char('y')));
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.current_page(), 0);
        assert!(session.typed_by_page().is_empty());
        assert_eq!(
            app.store.get("progress_a.txt").unwrap().as_deref(),
            Some(r#"{"page":0,"inputs":{}}"#)
        );
    }

    #[test]
    fn test_escape_returns_home_and_resumes_later() {
        let mut app = app_with(&[("a.txt", "ABCDE")], 2);
        app.open("a.txt");
        type_str(&mut app, "ABC");
        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.state, AppState::Home);
        assert_eq!(app.entries[0].progress, Some((2, 3)));

        app.on_key(key(KeyCode::Enter));
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.typed(), "C");
    }

    #[test]
    fn test_delete_from_home() {
        let mut app = app_with(&[("a.txt", "aa"), ("b.txt", "bb")], 2);
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.selected, 1);
        app.on_key(key(KeyCode::Char('d')));
        assert_eq!(app.prompt, Prompt::ConfirmDelete("b.txt".into()));
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.entries.len(), 1);
        assert_eq!(app.selected, 0);
        assert!(app.store.get("text_b.txt").unwrap().is_none());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with(&[], 2);
        app.on_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = app_with(&[("a.txt", "abc")], 2);
        app.open("a.txt");
        app.on_key(ctrl('c'));
        assert!(app.should_quit);
    }

    static OPENED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_ctrl_o_opens_illustration() {
        let mut app = app_with(&[("a.txt", "abc")], 2)
            .with_illustration_opener(|req| {
                assert!(req.url.contains("illustration%20for%3A%20ab"));
                OPENED.fetch_add(1, Ordering::SeqCst);
            });
        app.open("a.txt");
        app.on_key(ctrl('o'));
        assert_eq!(OPENED.load(Ordering::SeqCst), 1);
        assert_eq!(app.session.as_ref().unwrap().typed(), "");
    }

    #[test]
    fn test_import_file_starts_typing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut app = app_with(&[], 500);
        app.import_file(&path).unwrap();
        assert_eq!(app.state, AppState::Typing);
        assert_eq!(app.session.as_ref().unwrap().key(), "notes.txt");
        assert_eq!(app.entries.len(), 1);
    }
}
