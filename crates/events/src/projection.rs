use crate::Event;

/// A projection builds a read model from an append-only event stream.
///
/// Read models are **disposable**: they can be dropped and rebuilt from the
/// events at any time. Implementations must be deterministic for a given event
/// sequence, and callers are responsible for presenting events in a canonical
/// order when the projection is order-sensitive.
pub trait Projection {
    type Ev: Event;

    /// Apply a single event to the projection.
    ///
    /// Events that do not concern this projection are ignored.
    fn apply(&mut self, event: &Self::Ev);

    /// Apply a sequence of events in the given order.
    fn apply_all<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a Self::Ev>,
        Self::Ev: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }
}
