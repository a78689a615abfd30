use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Maximum depth of nested `publish` calls before further publishes are
/// dropped. The bus performs no cycle detection; this guard only bounds
/// runaway republish chains.
pub const MAX_DISPATCH_DEPTH: usize = 32;

type Handler<M> = Rc<RefCell<dyn FnMut(&M)>>;

struct Channel<M> {
    name: &'static str,
    handlers: Vec<(u64, Handler<M>)>,
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    channel: &'static str,
    token: u64,
}

/// Synchronous named-channel publish/subscribe.
///
/// Fan-out is synchronous and unbuffered: `publish` invokes every handler on
/// the channel before returning, so a slow handler blocks the publisher.
/// Within one channel, handlers fire in subscription order; no ordering is
/// guaranteed across channels.
///
/// Dispatch is re-entrant and depth-first: a handler may publish further
/// messages, which are fully delivered before the outer publish returns.
/// Handler lists are snapshotted per delivery, so subscribing or
/// unsubscribing from inside a handler takes effect on the next publish,
/// not the one in flight.
pub struct EventBus<M> {
    channels: RefCell<Vec<Channel<M>>>,
    next_token: Cell<u64>,
    depth: Cell<usize>,
}

impl<M> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> EventBus<M> {
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(Vec::new()),
            next_token: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    pub fn subscribe(
        &self,
        channel: &'static str,
        handler: impl FnMut(&M) + 'static,
    ) -> Subscription {
        let token = self.next_token.get();
        self.next_token.set(token + 1);

        let mut channels = self.channels.borrow_mut();
        let pos = match channels.iter().position(|c| c.name == channel) {
            Some(pos) => pos,
            None => {
                channels.push(Channel {
                    name: channel,
                    handlers: Vec::new(),
                });
                channels.len() - 1
            }
        };
        channels[pos]
            .handlers
            .push((token, Rc::new(RefCell::new(handler))));
        Subscription { channel, token }
    }

    /// Returns `true` if the subscription was still registered.
    pub fn unsubscribe(&self, sub: Subscription) -> bool {
        let mut channels = self.channels.borrow_mut();
        let Some(entry) = channels.iter_mut().find(|c| c.name == sub.channel) else {
            return false;
        };
        let before = entry.handlers.len();
        entry.handlers.retain(|(token, _)| *token != sub.token);
        entry.handlers.len() != before
    }

    /// Deliver `message` to every handler subscribed to `channel`, in
    /// subscription order. Returns the number of handlers reached.
    ///
    /// A handler that re-enters its own channel is skipped for the inner
    /// delivery (it is already on the stack).
    pub fn publish(&self, channel: &str, message: &M) -> usize {
        let depth = self.depth.get();
        if depth >= MAX_DISPATCH_DEPTH {
            return 0;
        }

        let snapshot: Vec<Handler<M>> = {
            let channels = self.channels.borrow();
            match channels.iter().find(|c| c.name == channel) {
                Some(entry) => entry.handlers.iter().map(|(_, h)| h.clone()).collect(),
                None => return 0,
            }
        };

        self.depth.set(depth + 1);
        let mut delivered = 0;
        for handler in snapshot {
            if let Ok(mut f) = handler.try_borrow_mut() {
                f(message);
                delivered += 1;
            }
        }
        self.depth.set(depth);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, MAX_DISPATCH_DEPTH};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_fire_in_subscription_order() {
        let bus = EventBus::<&'static str>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = seen.clone();
        bus.subscribe("ch", move |m| a.borrow_mut().push(format!("a:{m}")));
        let b = seen.clone();
        bus.subscribe("ch", move |m| b.borrow_mut().push(format!("b:{m}")));

        assert_eq!(bus.publish("ch", &"x"), 2);
        assert_eq!(*seen.borrow(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn unsubscribed_handlers_are_not_called() {
        let bus = EventBus::<u32>::new();
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let sub = bus.subscribe("ch", move |_| *c.borrow_mut() += 1);
        bus.publish("ch", &1);
        assert!(bus.unsubscribe(sub));
        assert!(!bus.unsubscribe(sub));
        bus.publish("ch", &2);

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn publish_to_unknown_channel_reaches_nobody() {
        let bus = EventBus::<u32>::new();
        assert_eq!(bus.publish("nobody", &0), 0);
    }

    #[test]
    fn reentrant_publish_is_depth_first() {
        let bus = Rc::new(EventBus::<&'static str>::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_seen = seen.clone();
        bus.subscribe("second", move |m| inner_seen.borrow_mut().push(*m));

        let chained = bus.clone();
        let outer_seen = seen.clone();
        bus.subscribe("first", move |_| {
            chained.publish("second", &"inner");
            outer_seen.borrow_mut().push("outer-done");
        });

        bus.publish("first", &"go");
        assert_eq!(*seen.borrow(), vec!["inner", "outer-done"]);
    }

    #[test]
    fn dispatch_depth_is_bounded() {
        let bus = Rc::new(EventBus::<u32>::new());
        let calls = Rc::new(RefCell::new(0usize));

        // A republish chain longer than the guard allows; the tail is
        // dropped rather than recursing further.
        let hops = MAX_DISPATCH_DEPTH + 8;
        let names: Vec<&'static str> = (0..=hops)
            .map(|i| &*Box::leak(format!("hop-{i}").into_boxed_str()))
            .collect();
        for i in 0..hops {
            let next = names[i + 1];
            let chained = bus.clone();
            let c = calls.clone();
            bus.subscribe(names[i], move |m| {
                *c.borrow_mut() += 1;
                chained.publish(next, m);
            });
        }

        bus.publish(names[0], &0);
        assert_eq!(*calls.borrow(), MAX_DISPATCH_DEPTH);
    }

    #[test]
    fn handler_republishing_into_its_own_channel_is_skipped() {
        let bus = Rc::new(EventBus::<u32>::new());
        let calls = Rc::new(RefCell::new(0usize));

        let chained = bus.clone();
        let c = calls.clone();
        bus.subscribe("ch", move |m| {
            *c.borrow_mut() += 1;
            if *m == 0 {
                chained.publish("ch", &1);
            }
        });

        bus.publish("ch", &0);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn subscribe_during_dispatch_misses_the_in_flight_message() {
        let bus = Rc::new(EventBus::<u32>::new());
        let late_calls = Rc::new(RefCell::new(0));

        let registrar = bus.clone();
        let late = late_calls.clone();
        bus.subscribe("ch", move |_| {
            let late = late.clone();
            registrar.subscribe("ch", move |_| *late.borrow_mut() += 1);
        });

        bus.publish("ch", &1);
        assert_eq!(*late_calls.borrow(), 0);
        bus.publish("ch", &2);
        assert_eq!(*late_calls.borrow(), 1);
    }
}
