//! Structured events mirroring the `info!`/`debug!` log lines emitted at the
//! same call sites, for embedders that want to subscribe without parsing log
//! output. A `Sink` is optional; `Driver::open` works with none configured.

use crossbeam_channel::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    InsertStart,
    InsertStop { count: usize },
    MaterializeStart,
    MaterializeIteration { derivations: usize },
    MaterializeStop { iterations: usize, total_derived: usize },
}

/// Anything that can receive `Event`s. A `crossbeam_channel::Sender` is the
/// only implementation shipped; a disconnected receiver is treated as "no
/// one is listening" rather than an error.
pub trait Sink: Send + Sync {
    fn emit(&self, event: Event);
}

pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Event>) -> Self {
        ChannelSink { tx }
    }
}

impl Sink for ChannelSink {
    fn emit(&self, event: Event) {
        // A closed receiver just means no one cares anymore.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = ChannelSink::new(tx);
        sink.emit(Event::InsertStop { count: 3 });
        assert_eq!(rx.try_recv(), Ok(Event::InsertStop { count: 3 }));
    }

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = ChannelSink::new(tx);
        drop(rx);
        sink.emit(Event::InsertStart);
    }
}
