use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender, TryRecvError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::warn;

use crate::game::Intent;
use crate::session::Message;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maps a key press to a session message. Only the four gameplay intents and
/// quit are recognised.
pub fn message_for_key(key: KeyEvent) -> Option<Message> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Message::Quit);
    }

    let intent = match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Message::Quit),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Char('h') => {
            Intent::Left
        }
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Char('l') => {
            Intent::Right
        }
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('j') => {
            Intent::SoftDrop
        }
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char('k') => {
            Intent::Rotate
        }
        _ => return None,
    };
    Some(Message::Intent(intent))
}

/// Reads terminal key events on a worker thread and forwards them as
/// messages. Dropping the listener stops polling and joins the thread.
pub struct InputListener {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl InputListener {
    pub fn spawn(sender: Sender<Message>) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || loop {
            match shutdown_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            let key = match event::poll(POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("input read failed: {}", e);
                        let _ = sender.send(Message::Quit);
                        break;
                    }
                },
                Err(e) => {
                    warn!("input poll failed: {}", e);
                    let _ = sender.send(Message::Quit);
                    break;
                }
            };

            if let Some(message) = message_for_key(key) {
                if sender.send(message).is_err() {
                    break;
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for InputListener {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
