use std::cell::Cell;
use std::io::{self, Stderr};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyEvent, KeyEventKind, KeyboardEnhancementFlags, MouseEvent,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

thread_local! {
    static OWNS_TERMINAL: Cell<bool> = const { Cell::new(false) };
}

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
#[allow(dead_code)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    Resize(u16, u16),
    Tick,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    _tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _tx = tx.clone();

        // Spawn event reader task
        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let Ok(evt) = evt else { continue };
                let app_event = match evt {
                    // Only handle key press events, not release
                    Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                    Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
                    Event::Paste(text) => Some(AppEvent::Paste(text)),
                    Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
                    _ => None,
                };

                if let Some(event) = app_event {
                    if tx_events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        // Tick drives the thinking animation and polls the pending round trip
        let tx_tick = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(100));
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, _tx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;

    // Shift+Enter is only distinguishable from Enter with the kitty protocol
    if supports_keyboard_enhancement().unwrap_or(false) {
        execute!(
            io::stderr(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(
        io::stderr(),
        PopKeyboardEnhancementFlags,
        DisableBracketedPaste,
        DisableMouseCapture
    )?;
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Mark the current thread as the one drawing the UI. Only panics raised
/// here restore the terminal; a panic in a spawned round trip is recovered
/// by the app and must leave the screen alone.
pub fn claim_terminal() {
    OWNS_TERMINAL.with(|owns| owns.set(true));
}

fn owns_terminal() -> bool {
    OWNS_TERMINAL.with(Cell::get)
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if owns_terminal() {
            let _ = restore();
        }
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_claiming_thread_owns_terminal() {
        assert!(!owns_terminal());
        claim_terminal();
        assert!(owns_terminal());

        let other = std::thread::spawn(owns_terminal).join().unwrap();
        assert!(!other);
    }
}
