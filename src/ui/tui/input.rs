use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::launcher::LauncherAction;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `q`, `Esc`, `Ctrl-C` and `Ctrl-D` close the dashboard
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'));
    }

    matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
}

/// Map a key press on the selector screen to an action
pub fn launcher_action(key: &KeyEvent) -> LauncherAction {
    if key.kind == KeyEventKind::Release {
        return LauncherAction::None;
    }
    if is_quit_key(key) {
        return LauncherAction::Quit;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => LauncherAction::Up,
        KeyCode::Down | KeyCode::Char('j') => LauncherAction::Down,
        KeyCode::Char(' ') => LauncherAction::Toggle,
        KeyCode::Right | KeyCode::Tab => LauncherAction::NextPeriod,
        KeyCode::Left | KeyCode::BackTab => LauncherAction::PreviousPeriod,
        KeyCode::Enter => LauncherAction::Start,
        _ => LauncherAction::None,
    }
}

/// Watches the keyboard on a plain thread so the dashboard's timers never
/// wait on terminal input. Dropping the listener stops it within one poll.
pub struct InputListener {
    stop: Arc<AtomicBool>,
}

impl InputListener {
    pub fn spawn(shutdown: mpsc::Sender<()>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => {}
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) if is_quit_key(&key) => {
                            debug!("Quit key pressed");
                            let _ = shutdown.try_send(());
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Failed to read terminal event: {}", e);
                            break;
                        }
                    },
                    Err(e) => {
                        warn!("Failed to poll terminal events: {}", e);
                        break;
                    }
                }
            }
        });

        Self { stop }
    }
}

impl Drop for InputListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&key(KeyCode::Char('q'))));
        assert!(is_quit_key(&key(KeyCode::Esc)));
        assert!(is_quit_key(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!is_quit_key(&key(KeyCode::Char('c'))));
        assert!(!is_quit_key(&key(KeyCode::Enter)));
    }

    #[test]
    fn test_launcher_key_mapping() {
        assert_eq!(launcher_action(&key(KeyCode::Down)), LauncherAction::Down);
        assert_eq!(launcher_action(&key(KeyCode::Char(' '))), LauncherAction::Toggle);
        assert_eq!(launcher_action(&key(KeyCode::Right)), LauncherAction::NextPeriod);
        assert_eq!(launcher_action(&key(KeyCode::Enter)), LauncherAction::Start);
        assert_eq!(launcher_action(&key(KeyCode::Esc)), LauncherAction::Quit);
        assert_eq!(launcher_action(&key(KeyCode::Char('x'))), LauncherAction::None);
    }
}
