use std::sync::mpsc::Sender;

/// Listener of loader lifecycle or error events.
pub trait EventListener<T>: Send + Sync {
    fn on_dispatch(&mut self, event: T);
}

impl<T: Send + Sync> EventListener<T> for Sender<T> {
    fn on_dispatch(&mut self, event: T) {
        // A hung-up receiver just stops observing.
        let _ = self.send(event);
    }
}

impl<T, F: FnMut(T) + Send + Sync> EventListener<T> for F {
    fn on_dispatch(&mut self, event: T) {
        self(event)
    }
}

/// Identifier of a bound listener, used to unbind it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventBinding(usize);

/// Collection of event listeners dispatched to in binding order.
pub struct EventBindings<T: Clone> {
    bindings: Vec<(EventBinding, Box<dyn EventListener<T>>, bool)>,
    id_generator: usize,
}

impl<T: Clone> Default for EventBindings<T> {
    fn default() -> Self {
        Self {
            bindings: Default::default(),
            id_generator: 0,
        }
    }
}

impl<T: Clone> EventBindings<T> {
    /// Binds a listener for every future dispatch.
    pub fn bind(&mut self, listener: impl EventListener<T> + 'static) -> EventBinding {
        let id = EventBinding(self.id_generator);
        self.id_generator += 1;
        self.bindings.push((id, Box::new(listener), false));
        id
    }

    /// Binds a listener dropped after the first dispatch it observes.
    pub fn bind_once(&mut self, listener: impl EventListener<T> + 'static) -> EventBinding {
        let id = EventBinding(self.id_generator);
        self.id_generator += 1;
        self.bindings.push((id, Box::new(listener), true));
        id
    }

    /// Unbinds a listener; returns whether it was still bound.
    pub fn unbind(&mut self, binding: EventBinding) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|(id, _, _)| *id != binding);
        self.bindings.len() != before
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Dispatches an event to every bound listener, in binding order.
    pub fn dispatch(&mut self, event: T) {
        for (_, listener, _) in self.bindings.iter_mut() {
            listener.on_dispatch(event.clone());
        }
        self.bindings.retain(|(_, _, once)| !once);
    }
}
