use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};
use log::info;

use crate::game::{step, GameState, Intent, PieceProvider, Rules};

// ============================================================================
// Messages
// ============================================================================

/// Everything the transition loop consumes. Timer ticks and keyboard input
/// share one ordered queue, so each transition sees the latest state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Message {
    Intent(Intent),
    Quit,
}

pub fn channel() -> (Sender<Message>, Receiver<Message>) {
    unbounded()
}

// ============================================================================
// Session
// ============================================================================

/// Sole owner of the game state. Each intent replaces the whole state with
/// the result of [`step`].
pub struct Session {
    state: GameState,
    rules: Rules,
    provider: Box<dyn PieceProvider>,
}

impl Session {
    pub fn new(rules: Rules, mut provider: Box<dyn PieceProvider>) -> Result<Self> {
        let state = GameState::new(&rules, provider.as_mut())?;
        Ok(Self::with_state(state, rules, provider))
    }

    pub fn with_state(state: GameState, rules: Rules, provider: Box<dyn PieceProvider>) -> Self {
        Self {
            state,
            rules,
            provider,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Applies one intent. Returns false when the intent was rejected and the
    /// state is unchanged.
    pub fn apply(&mut self, intent: Intent) -> bool {
        let next = step(&self.state, intent, &self.rules, self.provider.as_mut());
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Drains `receiver` until `Quit` or until every sender is gone. The
    /// initial state and every state that differs from its predecessor is
    /// handed to `on_commit`; an error from it stops the loop.
    pub fn run<F>(&mut self, receiver: &Receiver<Message>, mut on_commit: F) -> Result<()>
    where
        F: FnMut(&GameState) -> Result<()>,
    {
        info!(
            "session started on a {}x{} board",
            self.rules.rows, self.rules.cols
        );
        on_commit(&self.state)?;

        for message in receiver.iter() {
            match message {
                Message::Quit => break,
                Message::Intent(intent) => {
                    if self.apply(intent) {
                        on_commit(&self.state)?;
                    }
                }
            }
        }

        info!("session stopped with score {}", self.state.score);
        Ok(())
    }
}

// ============================================================================
// Tick Driver
// ============================================================================

/// Sends `Intent::Tick` at a fixed period from a worker thread. Dropping the
/// driver stops the timer and joins the thread.
pub struct TickDriver {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    pub fn spawn(period: Duration, sender: Sender<Message>) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let ticker = tick(period);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if sender.send(Message::Intent(Intent::Tick)).is_err() {
                            break;
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        // Disconnecting the shutdown channel wakes the worker.
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
