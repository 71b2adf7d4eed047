//! Outbound dab batching

use fresco_ipc::{ClientMessage, DabsPayload, MAX_DAB_FLOATS};
use painting::{Dab, ToolMode, dabs_as_floats};
use tracing::debug;

use crate::SyncError;
use crate::transport::Outbound;

/// Most dabs one `dabs` message may carry
pub const MAX_BATCH_DABS: usize = MAX_DAB_FLOATS / 4;

/// What a flush did with the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing was buffered
    Empty,
    /// No open transport; this many dabs were dropped
    Discarded(usize),
    /// Sent to the server, to be mirrored into the echo layer
    Sent(Vec<Dab>),
}

/// Buffers dabs between timer ticks and sends them as one batch
///
/// Delivery is at-most-once: a flush without an open transport drops the
/// buffer rather than keeping it for later.
#[derive(Debug, Default)]
pub struct BatchDispatcher {
    buffer: Vec<Dab>,
}

impl BatchDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, dab: Dab) {
        self.buffer.push(dab);
    }

    pub fn extend(&mut self, dabs: impl IntoIterator<Item = Dab>) {
        self.buffer.extend(dabs);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop everything buffered
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }

    /// Send the buffer as `dabs` messages, split so none exceeds
    /// [`MAX_BATCH_DABS`]. The buffer is empty afterwards whatever happens.
    pub fn flush<T: Outbound + ?Sized>(
        &mut self,
        transport: Option<&mut T>,
        tool: ToolMode,
    ) -> Result<FlushOutcome, SyncError> {
        if self.buffer.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        let batch = std::mem::take(&mut self.buffer);

        let transport = match transport {
            Some(transport) if transport.is_open() => transport,
            _ => {
                debug!(
                    "BatchDispatcher::flush: transport not open, dropping {} dabs",
                    batch.len()
                );
                return Ok(FlushOutcome::Discarded(batch.len()));
            }
        };

        for chunk in batch.chunks(MAX_BATCH_DABS) {
            let payload = DabsPayload::new(tool.to_wire().into(), dabs_as_floats(chunk).to_vec());
            transport.send(&ClientMessage::Dabs(payload))?;
        }
        debug!(
            "BatchDispatcher::flush: sent {} dabs, tool={:?}",
            batch.len(),
            tool
        );
        Ok(FlushOutcome::Sent(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        closed: bool,
        sent: Vec<ClientMessage>,
    }

    impl Outbound for Recorder {
        fn is_open(&self) -> bool {
            !self.closed
        }

        fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError> {
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn dab(x: f32) -> Dab {
        Dab::new(x, 0.0, 6.0, 1.0)
    }

    #[test]
    fn test_flush_empty_sends_nothing() {
        let mut dispatcher = BatchDispatcher::new();
        let mut out = Recorder::default();
        let outcome = dispatcher.flush(Some(&mut out), ToolMode::Normal).unwrap();
        assert_eq!(outcome, FlushOutcome::Empty);
        assert!(out.sent.is_empty());
    }

    #[test]
    fn test_flush_sends_one_message() {
        let mut dispatcher = BatchDispatcher::new();
        dispatcher.enqueue(dab(1.0));
        dispatcher.extend([dab(2.0), dab(3.0)]);
        assert_eq!(dispatcher.len(), 3);

        let mut out = Recorder::default();
        let outcome = dispatcher.flush(Some(&mut out), ToolMode::Erase).unwrap();

        assert_eq!(outcome, FlushOutcome::Sent(vec![dab(1.0), dab(2.0), dab(3.0)]));
        assert!(dispatcher.is_empty());
        assert_eq!(
            out.sent,
            vec![ClientMessage::Dabs(DabsPayload::new(
                1,
                vec![1.0, 0.0, 6.0, 1.0, 2.0, 0.0, 6.0, 1.0, 3.0, 0.0, 6.0, 1.0]
            ))]
        );
    }

    #[test]
    fn test_flush_closed_transport_discards() {
        let mut dispatcher = BatchDispatcher::new();
        dispatcher.extend([dab(1.0), dab(2.0), dab(3.0)]);

        let mut out = Recorder {
            closed: true,
            ..Default::default()
        };
        let outcome = dispatcher.flush(Some(&mut out), ToolMode::Normal).unwrap();
        assert_eq!(outcome, FlushOutcome::Discarded(3));
        assert!(out.sent.is_empty());
        assert!(dispatcher.is_empty());

        dispatcher.enqueue(dab(4.0));
        let outcome = dispatcher.flush(None::<&mut Recorder>, ToolMode::Normal).unwrap();
        assert_eq!(outcome, FlushOutcome::Discarded(1));
    }

    #[test]
    fn test_large_batch_is_split() {
        let mut dispatcher = BatchDispatcher::new();
        dispatcher.extend((0..2500).map(|i| dab(i as f32)));

        let mut out = Recorder::default();
        dispatcher.flush(Some(&mut out), ToolMode::Normal).unwrap();

        let sizes: Vec<usize> = out
            .sent
            .iter()
            .map(|m| match m {
                ClientMessage::Dabs(payload) => payload.dab_count(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(sizes, vec![1024, 1024, 452]);
    }

    #[test]
    fn test_discard() {
        let mut dispatcher = BatchDispatcher::new();
        dispatcher.extend([dab(1.0), dab(2.0)]);
        assert_eq!(dispatcher.discard(), 2);
        assert!(dispatcher.is_empty());
    }
}
