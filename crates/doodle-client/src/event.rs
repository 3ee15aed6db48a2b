use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    EndRound,
    Advance,
    ShowScoreboard,
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// One-second clock driving the round timer.
    Tick,
    /// Time to re-fetch the room snapshot.
    Poll,
    /// A delayed session callback. Stale generations are dropped by the app.
    Deferred { generation: u64, event: Deferred },
}

pub async fn event_loop(
    event_tx: mpsc::Sender<AppEvent>,
    tick_every: Duration,
    poll_every: Duration,
) {
    let mut key_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(tick_every);
    let mut poll_interval = tokio::time::interval(poll_every);
    // Both intervals fire immediately; skip that first tick.
    tick_interval.tick().await;
    poll_interval.tick().await;

    loop {
        let event = tokio::select! {
            Some(Ok(Event::Key(key))) = key_stream.next() => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                AppEvent::Key(key)
            }
            _ = tick_interval.tick() => AppEvent::Tick,
            _ = poll_interval.tick() => AppEvent::Poll,
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }
}

/// Deliver `event` after `delay`, tagged with the generation it belongs to.
pub fn schedule(
    event_tx: &mpsc::Sender<AppEvent>,
    generation: u64,
    delay: Duration,
    event: Deferred,
) {
    let tx = event_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(AppEvent::Deferred { generation, event }).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schedule_delivers_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        schedule(&tx, 7, Duration::from_millis(60), Deferred::Advance);
        schedule(&tx, 7, Duration::from_millis(10), Deferred::EndRound);

        match rx.recv().await {
            Some(AppEvent::Deferred { generation, event }) => {
                assert_eq!(generation, 7);
                assert_eq!(event, Deferred::EndRound);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await {
            Some(AppEvent::Deferred { event, .. }) => assert_eq!(event, Deferred::Advance),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
