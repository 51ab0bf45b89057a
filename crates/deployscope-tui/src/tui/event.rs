use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal events, plus a tick that drives redraws while lines stream in
#[derive(Clone, Debug)]
pub enum Event {
    /// Periodic redraw tick
    Tick,
    /// Key press event
    Key(KeyEvent),
    /// Pasted text (bracketed paste, fed into the filter input)
    Paste(String),
    /// Terminal resize
    Resize(u16, u16),
    /// Error occurred
    Error(String),
}

/// Map a raw crossterm event to ours. Key releases and events we do not
/// route (focus, mouse) are dropped here.
fn map_event(evt: CrosstermEvent) -> Option<Event> {
    match evt {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Paste(text) => Some(Event::Paste(text)),
        CrosstermEvent::Resize(w, h) => Some(Event::Resize(w, h)),
        _ => None,
    }
}

/// Reads terminal input and emits ticks on one channel
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Spawn the reader task with the given tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = {
            let sender = sender.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let mut reader = event::EventStream::new();
                let mut tick_interval = tokio::time::interval(tick_rate);

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,

                        _ = tick_interval.tick() => {
                            let _ = sender.send(Event::Tick);
                        }

                        maybe_event = reader.next().fuse() => {
                            match maybe_event {
                                Some(Ok(evt)) => {
                                    if let Some(event) = map_event(evt) {
                                        let _ = sender.send(event);
                                    }
                                }
                                Some(Err(e)) => {
                                    let _ = sender.send(Event::Error(e.to_string()));
                                }
                                None => break,
                            }
                        }
                    }
                }
            })
        };

        Self {
            receiver,
            cancel,
            task,
        }
    }

    /// Receive the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Stop the reader task
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_map_event_routes_presses_and_paste() {
        let press = CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(matches!(map_event(press), Some(Event::Key(_))));

        let paste = CrosstermEvent::Paste("error 500".to_string());
        assert!(matches!(map_event(paste), Some(Event::Paste(text)) if text == "error 500"));

        assert!(matches!(
            map_event(CrosstermEvent::Resize(80, 24)),
            Some(Event::Resize(80, 24))
        ));
    }

    #[test]
    fn test_map_event_drops_key_releases() {
        let release = CrosstermEvent::Key(KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert!(map_event(release).is_none());
    }
}
