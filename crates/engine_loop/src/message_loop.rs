//! The [`MessageLoop`]: system ownership, initialization and the tick.
//!
//! ## Lifecycle
//!
//! 1. [`MessageLoop::create_system`] registers every system.
//! 2. [`MessageLoop::initialize`] calls [`System::initialize`] on each, then
//!    orders them so that every system comes after its dependencies.
//! 3. [`MessageLoop::update`] runs one tick:
//!    - swap the two message queues, so anything enqueued from here on waits
//!      for the next tick;
//!    - deliver queued commands to their receivers;
//!    - deliver queued events to every system but their source, then to all
//!      listeners;
//!    - deliver queued generic messages to every system;
//!    - call [`System::on_update`] on every system in dependency order.
//!
//! A system is checked out of its slot while one of its hooks runs. An
//! immediate event raised from a hook that targets a system which is running
//! further up the call stack is held back and delivered to it as soon as its
//! current hook returns.

use std::any::{Any, TypeId};
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::{debug, info, trace, warn};

use crate::command::{Command, CommandFactory, TypedCommandFactory};
use crate::config::LoopConfig;
use crate::context::Context;
use crate::error::LoopError;
use crate::listener::{Listener, ListenerFn, ListenerId};
use crate::message::{Envelope, Event, Message, MessageKind, MessageTypeId, Route};
use crate::registry::TypeRegistry;
use crate::scheduler::{self, DependencyNode};
use crate::system::{Dependencies, System, SystemInfo, SystemTypeId};

struct SystemSlot {
    id: SystemTypeId,
    type_id: TypeId,
    name: &'static str,
    system: Option<Box<dyn System>>,
}

impl SystemSlot {
    fn info(&self) -> SystemInfo {
        SystemInfo {
            id: self.id,
            name: self.name,
        }
    }
}

/// Owner of all systems, message queues and listeners.
pub struct MessageLoop {
    config: LoopConfig,
    registry: TypeRegistry,
    systems: Vec<SystemSlot>,
    active_queue: Vec<Envelope>,
    processing_queue: Vec<Envelope>,
    command_factories: Vec<Option<Box<dyn CommandFactory>>>,
    message_type_names: Vec<Option<String>>,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    /// Immediate events waiting for a busy system to return.
    deferred: Vec<(SystemTypeId, Rc<Envelope>)>,
    initialized: bool,
}

impl Default for MessageLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLoop {
    /// Create an empty loop with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Create an empty loop.
    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            active_queue: Vec::with_capacity(config.queue_capacity),
            processing_queue: Vec::with_capacity(config.queue_capacity),
            config,
            registry: TypeRegistry::new(),
            systems: Vec::new(),
            command_factories: Vec::new(),
            message_type_names: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 1,
            deferred: Vec::new(),
            initialized: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Register a system. Only allowed before [`MessageLoop::initialize`].
    ///
    /// # Errors
    ///
    /// Fails after initialization or if a system of the same type or name
    /// already exists.
    pub fn create_system<T: System>(&mut self, system: T) -> Result<SystemTypeId, LoopError> {
        let name = T::type_name();
        if self.initialized {
            warn!(system = name, "system created after initialization");
            return Err(LoopError::CreateAfterInitialize { name });
        }
        let type_id = TypeId::of::<T>();
        if self
            .systems
            .iter()
            .any(|slot| slot.type_id == type_id || slot.name == name)
        {
            warn!(system = name, "duplicate system");
            return Err(LoopError::DuplicateSystem { name });
        }

        let id = self.registry.system_type_id::<T>();
        self.systems.push(SystemSlot {
            id,
            type_id,
            name,
            system: Some(Box::new(system)),
        });
        debug!(system = name, id = id.0, "system created");
        Ok(id)
    }

    /// Initialize every system and order them by their dependencies.
    ///
    /// # Errors
    ///
    /// Fails if already initialized or if some dependency can not be
    /// resolved (missing system or cycle). The error lists each unresolved
    /// system with its outstanding dependencies.
    pub fn initialize(&mut self) -> Result<(), LoopError> {
        if self.initialized {
            warn!("message loop initialized twice");
            return Err(LoopError::AlreadyInitialized);
        }

        let mut nodes = Vec::with_capacity(self.systems.len());
        for index in 0..self.systems.len() {
            let dependencies = self
                .with_system(index, |system, ctx| system.initialize(ctx))
                .unwrap_or_else(Dependencies::none);
            let slot = &self.systems[index];
            nodes.push(DependencyNode {
                name: slot.name,
                type_id: slot.type_id,
                dependencies,
            });
        }

        let stages = match scheduler::resolve_stages(&nodes) {
            Ok(stages) => stages,
            Err(unresolved) => {
                let report = unresolved
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                warn!(unresolved = unresolved.len(), "unresolved system dependencies");
                return Err(LoopError::UnresolvedDependencies { report });
            }
        };

        let mut slots: Vec<Option<SystemSlot>> =
            mem::take(&mut self.systems).into_iter().map(Some).collect();
        self.systems = scheduler::execution_order(&stages)
            .into_iter()
            .filter_map(|index| slots.get_mut(index).and_then(Option::take))
            .collect();
        self.initialized = true;

        info!(
            systems = ?self.systems.iter().map(|slot| slot.name).collect::<Vec<_>>(),
            stages = stages.len(),
            "message loop initialized"
        );
        Ok(())
    }

    /// Returns `true` once [`MessageLoop::initialize`] succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Systems in registration order before initialization and in
    /// dependency order after.
    #[must_use]
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.systems.iter().map(SystemSlot::info).collect()
    }

    /// Find a system by type. `None` while that system's own hook runs.
    #[must_use]
    pub fn find_system<T: System>(&self) -> Option<&T> {
        let slot = self.slot_of::<T>()?;
        let system: &dyn Any = slot.system.as_deref()?;
        system.downcast_ref::<T>()
    }

    /// Find a system by type, mutably. `None` while that system's own hook runs.
    #[must_use]
    pub fn find_system_mut<T: System>(&mut self) -> Option<&mut T> {
        let type_id = TypeId::of::<T>();
        let slot = self.systems.iter_mut().find(|slot| slot.type_id == type_id)?;
        let system: &mut dyn Any = slot.system.as_deref_mut()?;
        system.downcast_mut::<T>()
    }

    /// Id of system type `T`, if registered.
    #[must_use]
    pub fn find_system_id<T: System>(&self) -> Option<SystemTypeId> {
        self.slot_of::<T>().map(|slot| slot.id)
    }

    /// Find a system by name.
    #[must_use]
    pub fn find_system_by_name(&self, name: &str) -> Option<SystemInfo> {
        self.systems
            .iter()
            .find(|slot| slot.name == name)
            .map(SystemSlot::info)
    }

    /// Find a system by id.
    #[must_use]
    pub fn find_system_by_id(&self, id: SystemTypeId) -> Option<SystemInfo> {
        self.systems
            .iter()
            .find(|slot| slot.id == id)
            .map(SystemSlot::info)
    }

    fn slot_of<T: System>(&self) -> Option<&SystemSlot> {
        let type_id = TypeId::of::<T>();
        self.systems.iter().find(|slot| slot.type_id == type_id)
    }

    /// Type id of message type `M`, allocated on first use.
    pub fn message_type_id<M: 'static>(&mut self) -> MessageTypeId {
        self.registry.message_type_id::<M>()
    }

    /// Register a command factory under its type id, replacing any earlier
    /// one. The factory's type name is recorded as well.
    pub fn register_command_factory(&mut self, factory: Box<dyn CommandFactory>) {
        let type_id = factory.message_type_id();
        let Some(index) = type_id.index() else {
            warn!(command = factory.message_type_name(), "command factory without type id");
            return;
        };
        if index >= self.command_factories.len() {
            self.command_factories.resize_with(index + 1, || None);
        }
        self.register_message_type(factory.message_type_name(), type_id);
        debug!(
            command = factory.message_type_name(),
            type_id = type_id.0,
            receiver = factory.receiver().0,
            "command registered"
        );
        self.command_factories[index] = Some(factory);
    }

    /// Register command `C` addressed to `receiver`.
    pub fn register_command<C: Command>(&mut self, receiver: SystemTypeId) -> MessageTypeId {
        let type_id = self.registry.message_type_id::<C>();
        self.register_command_factory(Box::new(TypedCommandFactory::<C>::new(receiver, type_id)));
        type_id
    }

    /// Register the name of event `E`.
    pub fn register_event<E: Event>(&mut self) -> MessageTypeId {
        let type_id = self.registry.message_type_id::<E>();
        self.register_message_type(E::type_name(), type_id);
        type_id
    }

    /// Register the name of generic message `M`.
    pub fn register_message<M: Message>(&mut self) -> MessageTypeId {
        let type_id = self.registry.message_type_id::<M>();
        self.register_message_type(M::type_name(), type_id);
        type_id
    }

    /// Record a name for a message type id.
    pub fn register_message_type(&mut self, name: impl Into<String>, type_id: MessageTypeId) {
        let Some(index) = type_id.index() else {
            return;
        };
        if index >= self.message_type_names.len() {
            self.message_type_names.resize(index + 1, None);
        }
        let name = name.into();
        trace!(message = %name, type_id = type_id.0, "message type registered");
        self.message_type_names[index] = Some(name);
    }

    /// Type id of a registered message name.
    #[must_use]
    pub fn find_message_type_id(&self, name: &str) -> Option<MessageTypeId> {
        self.message_type_names
            .iter()
            .position(|registered| registered.as_deref() == Some(name))
            .map(MessageTypeId::from_index)
    }

    /// Name of a registered message type id.
    #[must_use]
    pub fn find_message_type_name(&self, type_id: MessageTypeId) -> Option<&str> {
        self.message_type_names.get(type_id.index()?)?.as_deref()
    }

    /// Command factory registered for a type id.
    #[must_use]
    pub fn find_command_factory(&self, type_id: MessageTypeId) -> Option<&dyn CommandFactory> {
        self.command_factories.get(type_id.index()?)?.as_deref()
    }

    /// Command factory registered for a command name.
    #[must_use]
    pub fn find_command_factory_by_name(&self, name: &str) -> Option<&dyn CommandFactory> {
        self.command_factories
            .iter()
            .flatten()
            .find(|factory| factory.message_type_name() == name)
            .map(|factory| &**factory)
    }

    /// Register a callback for every dispatched event.
    pub fn create_listener(
        &mut self,
        callback: impl FnMut(MessageTypeId, &Envelope) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        let callback: ListenerFn = Box::new(callback);
        self.listeners.push(Listener { id, callback });
        debug!(listener = id.0, "listener created");
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn release_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        before != self.listeners.len()
    }

    /// Queue a generic message for the next tick.
    pub fn enqueue_message<M: Message>(&mut self, message: M) {
        let type_id = self.registry.message_type_id::<M>();
        self.active_queue.push(Envelope::message(type_id, message));
    }

    /// Queue an event for the next tick.
    pub fn enqueue_event<E: Event>(&mut self, source: Option<SystemTypeId>, event: E) {
        let type_id = self.registry.message_type_id::<E>();
        self.active_queue.push(Envelope::event(type_id, source, event));
    }

    /// Queue a command for its registered receiver.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::CommandNotRegistered`] if no system registered `C`.
    pub fn enqueue_command<C: Command>(&mut self, command: C) -> Result<(), LoopError> {
        let receiver = self
            .registry
            .find_message_type_id::<C>()
            .and_then(|type_id| self.find_command_factory(type_id))
            .map(|factory| factory.receiver());
        let Some(receiver) = receiver else {
            warn!(command = C::type_name(), "command not registered");
            return Err(LoopError::CommandNotRegistered {
                name: C::type_name(),
            });
        };
        let type_id = self.registry.message_type_id::<C>();
        self.active_queue
            .push(Envelope::command(type_id, receiver, command));
        Ok(())
    }

    /// Queue a command given its type id and MessagePack payload.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::UnknownCommandType`] if no factory is registered
    /// for `type_id`, or [`LoopError::Decode`] if `data` does not decode.
    pub fn enqueue_command_raw(
        &mut self,
        type_id: MessageTypeId,
        data: &[u8],
    ) -> Result<(), LoopError> {
        let Some(factory) = self.find_command_factory(type_id) else {
            warn!(type_id = type_id.0, "unknown command type");
            return Err(LoopError::UnknownCommandType(type_id));
        };
        let envelope = factory.create(data)?;
        self.active_queue.push(envelope);
        Ok(())
    }

    /// Number of messages waiting for the next tick.
    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.active_queue.len()
    }

    /// Deliver an event immediately, bypassing the queue.
    ///
    /// Every system except `source` sees it, then every listener. A system
    /// whose own hook is still running gets it right after that hook returns.
    pub fn dispatch_event<E: Event>(&mut self, source: Option<SystemTypeId>, event: E) {
        let type_id = self.registry.message_type_id::<E>();
        let envelope = Rc::new(Envelope::event(type_id, source, event));

        for index in 0..self.systems.len() {
            let slot = &self.systems[index];
            if Some(slot.id) == source {
                continue;
            }
            if slot.system.is_none() {
                debug!(
                    event = envelope.message_type_name(),
                    system = slot.name,
                    "deferring event until system returns"
                );
                self.deferred.push((slot.id, Rc::clone(&envelope)));
            } else {
                self.deliver_to(index, &envelope);
            }
        }
        self.notify_listeners(&envelope);
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::NotInitialized`] before [`MessageLoop::initialize`].
    pub fn update(&mut self) -> Result<(), LoopError> {
        if !self.initialized {
            return Err(LoopError::NotInitialized);
        }

        mem::swap(&mut self.active_queue, &mut self.processing_queue);
        let mut processing = mem::take(&mut self.processing_queue);

        for kind in [MessageKind::Command, MessageKind::Event, MessageKind::Message] {
            for envelope in processing.iter().filter(|envelope| envelope.kind() == kind) {
                self.deliver(envelope);
            }
        }

        processing.clear();
        self.processing_queue = processing;

        for index in 0..self.systems.len() {
            self.with_system(index, |system, ctx| system.on_update(ctx));
        }
        Ok(())
    }

    fn deliver(&mut self, envelope: &Envelope) {
        match envelope.route() {
            Route::Command { receiver } => {
                let Some(index) = self.systems.iter().position(|slot| slot.id == receiver) else {
                    warn!(
                        command = envelope.message_type_name(),
                        receiver = receiver.0,
                        "command receiver not found"
                    );
                    return;
                };
                self.deliver_to(index, envelope);
            }
            Route::Event { source } => {
                self.broadcast(envelope, source);
                self.notify_listeners(envelope);
            }
            Route::Broadcast => self.broadcast(envelope, None),
        }
    }

    fn notify_listeners(&mut self, envelope: &Envelope) {
        for listener in &mut self.listeners {
            (listener.callback)(envelope.message_type_id(), envelope);
        }
    }

    fn broadcast(&mut self, envelope: &Envelope, except: Option<SystemTypeId>) {
        for index in 0..self.systems.len() {
            if Some(self.systems[index].id) != except {
                self.deliver_to(index, envelope);
            }
        }
    }

    fn deliver_to(&mut self, index: usize, envelope: &Envelope) {
        if self.config.trace_dispatch {
            trace!(
                message = envelope.message_type_name(),
                kind = ?envelope.kind(),
                system = self.systems[index].name,
                "dispatch"
            );
        }
        self.with_system(index, |system, ctx| system.on_message(ctx, envelope));
    }

    /// Check out the system at `index`, run `f` with a context, put it back
    /// and hand it any events deferred while it ran. `None` if the system is
    /// already checked out.
    fn with_system<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn System, &mut Context<'_>) -> R,
    ) -> Option<R> {
        let slot = self.systems.get_mut(index)?;
        let id = slot.id;
        let Some(mut system) = slot.system.take() else {
            warn!(system = slot.name, "system is busy, skipping re-entrant delivery");
            return None;
        };

        let result = {
            let mut ctx = Context::new(self, id);
            f(system.as_mut(), &mut ctx)
        };

        if let Some(slot) = self.systems.iter_mut().find(|slot| slot.id == id) {
            slot.system = Some(system);
        }
        self.flush_deferred(id);
        Some(result)
    }

    fn flush_deferred(&mut self, id: SystemTypeId) {
        while let Some(position) = self.deferred.iter().position(|(target, _)| *target == id) {
            let (_, envelope) = self.deferred.remove(position);
            let Some(index) = self.systems.iter().position(|slot| slot.id == id) else {
                continue;
            };
            self.deliver_to(index, &envelope);
        }
    }
}

impl fmt::Debug for MessageLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLoop")
            .field("systems", &self.systems())
            .field("pending", &self.active_queue.len())
            .field("listeners", &self.listeners.len())
            .field("deferred", &self.deferred.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::codec;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Jump {
        height: u32,
    }

    impl Command for Jump {
        fn type_name() -> &'static str {
            "Jump"
        }
    }

    #[derive(Debug)]
    struct Landed;

    impl Event for Landed {
        fn type_name() -> &'static str {
            "Landed"
        }
    }

    #[derive(Debug)]
    struct Frame(u32);

    impl Message for Frame {
        fn type_name() -> &'static str {
            "Frame"
        }
    }

    /// Receives `Jump`, raises `Landed` and re-queues a `Frame` from its
    /// command handler.
    struct Player {
        log: Log,
    }

    impl System for Player {
        fn type_name() -> &'static str {
            "Player"
        }

        fn initialize(&mut self, ctx: &mut Context<'_>) -> Dependencies {
            ctx.register_command::<Jump>();
            ctx.register_event::<Landed>();
            Dependencies::none()
        }

        fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
            if let Some(jump) = message.as_command::<Jump>() {
                self.log.borrow_mut().push(format!("player command {}", jump.height));
                ctx.enqueue_message(Frame(99));
            } else if message.as_event::<Landed>().is_some() {
                self.log.borrow_mut().push("player event".to_string());
            } else if let Some(frame) = message.as_message::<Frame>() {
                self.log.borrow_mut().push(format!("player message {}", frame.0));
            }
        }

        fn on_update(&mut self, _ctx: &mut Context<'_>) {
            self.log.borrow_mut().push("player update".to_string());
        }
    }

    /// Depends on `Player`; logs everything it sees.
    struct Audio {
        log: Log,
    }

    impl System for Audio {
        fn type_name() -> &'static str {
            "Audio"
        }

        fn initialize(&mut self, _ctx: &mut Context<'_>) -> Dependencies {
            Dependencies::none().on::<Player>()
        }

        fn on_message(&mut self, _ctx: &mut Context<'_>, message: &Envelope) {
            self.log
                .borrow_mut()
                .push(format!("audio {}", message.message_type_name()));
        }

        fn on_update(&mut self, _ctx: &mut Context<'_>) {
            self.log.borrow_mut().push("audio update".to_string());
        }
    }

    struct Orphan;

    impl System for Orphan {
        fn type_name() -> &'static str {
            "Orphan"
        }

        fn initialize(&mut self, _ctx: &mut Context<'_>) -> Dependencies {
            Dependencies::none().on::<Ghost>()
        }
    }

    struct Ghost;

    impl System for Ghost {
        fn type_name() -> &'static str {
            "Ghost"
        }
    }

    fn make_loop(log: &Log) -> MessageLoop {
        let mut message_loop = MessageLoop::new();
        // Registered dependent-first to exercise ordering.
        message_loop.create_system(Audio { log: log.clone() }).unwrap();
        message_loop.create_system(Player { log: log.clone() }).unwrap();
        message_loop.initialize().unwrap();
        message_loop
    }

    fn take(log: &Log) -> Vec<String> {
        mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_dependency_order() {
        let log = Log::default();
        let message_loop = make_loop(&log);
        let names: Vec<_> = message_loop.systems().iter().map(|info| info.name).collect();
        assert_eq!(names, vec!["Player", "Audio"]);
        assert!(message_loop.is_initialized());
    }

    #[test]
    fn test_unresolved_dependency_fails() {
        let mut message_loop = MessageLoop::new();
        message_loop.create_system(Orphan).unwrap();
        let err = message_loop.initialize().unwrap_err();
        match err {
            LoopError::UnresolvedDependencies { report } => assert_eq!(report, "Orphan (Ghost)"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!message_loop.is_initialized());
    }

    #[test]
    fn test_configuration_errors() {
        let log = Log::default();
        let mut message_loop = MessageLoop::new();
        assert!(matches!(message_loop.update(), Err(LoopError::NotInitialized)));

        message_loop.create_system(Player { log: log.clone() }).unwrap();
        assert!(matches!(
            message_loop.create_system(Player { log: log.clone() }),
            Err(LoopError::DuplicateSystem { name: "Player" })
        ));
        message_loop.initialize().unwrap();
        assert!(matches!(
            message_loop.initialize(),
            Err(LoopError::AlreadyInitialized)
        ));
        assert!(matches!(
            message_loop.create_system(Ghost),
            Err(LoopError::CreateAfterInitialize { name: "Ghost" })
        ));
    }

    #[test]
    fn test_dispatch_order_within_tick() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        let player = message_loop.find_system_id::<Player>();

        message_loop.enqueue_message(Frame(1));
        message_loop.enqueue_event(None, Landed);
        message_loop.enqueue_command(Jump { height: 3 }).unwrap();
        message_loop.update().unwrap();

        assert_eq!(
            take(&log),
            vec![
                "player command 3",
                "player event",
                "audio Landed",
                "player message 1",
                "audio Frame",
                "player update",
                "audio update",
            ]
        );
        assert!(player.is_some());
    }

    #[test]
    fn test_message_enqueued_during_tick_waits_for_next_tick() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);

        message_loop.enqueue_command(Jump { height: 1 }).unwrap();
        message_loop.update().unwrap();
        let first = take(&log);
        assert!(!first.iter().any(|line| line == "player message 99"));
        assert_eq!(message_loop.pending_messages(), 1);

        message_loop.update().unwrap();
        let second = take(&log);
        assert_eq!(second[0], "player message 99");
        assert_eq!(message_loop.pending_messages(), 0);
    }

    #[test]
    fn test_event_skips_source_and_reaches_listeners() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        let player = message_loop.find_system_id::<Player>();

        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = heard.clone();
        let listener = message_loop.create_listener(move |type_id, envelope| {
            sink.borrow_mut().push((type_id, envelope.message_type_name()));
        });

        message_loop.dispatch_event(player, Landed);
        assert_eq!(take(&log), vec!["audio Landed"]);
        let landed = message_loop.find_message_type_id("Landed").unwrap();
        assert_eq!(*heard.borrow(), vec![(landed, "Landed")]);

        assert!(message_loop.release_listener(listener));
        assert!(!message_loop.release_listener(listener));
        message_loop.dispatch_event(player, Landed);
        assert_eq!(heard.borrow().len(), 1);
    }

    #[test]
    fn test_queued_event_skips_source() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        let player = message_loop.find_system_id::<Player>();
        assert!(player.is_some());

        message_loop.enqueue_event(player, Landed);
        message_loop.update().unwrap();

        let lines = take(&log);
        assert!(!lines.iter().any(|line| line == "player event"));
        assert_eq!(lines, vec!["audio Landed", "player update", "audio update"]);
    }

    #[test]
    fn test_enqueue_unregistered_command_fails() {
        let mut message_loop = MessageLoop::new();
        message_loop.initialize().unwrap();
        assert!(matches!(
            message_loop.enqueue_command(Jump { height: 1 }),
            Err(LoopError::CommandNotRegistered { name: "Jump" })
        ));
        assert!(matches!(
            message_loop.enqueue_command_raw(MessageTypeId(42), &[]),
            Err(LoopError::UnknownCommandType(MessageTypeId(42)))
        ));
    }

    #[test]
    fn test_enqueue_command_raw() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        let type_id = message_loop.find_message_type_id("Jump").unwrap();
        let factory = message_loop.find_command_factory(type_id).unwrap();
        assert_eq!(Some(factory.receiver()), message_loop.find_system_id::<Player>());
        assert!(message_loop.find_command_factory_by_name("Jump").is_some());

        let bytes = codec::encode(&Jump { height: 7 }).unwrap();
        message_loop.enqueue_command_raw(type_id, &bytes).unwrap();
        assert!(matches!(
            message_loop.enqueue_command_raw(type_id, &[0xc1]),
            Err(LoopError::Decode(_))
        ));
        message_loop.update().unwrap();
        assert_eq!(take(&log)[0], "player command 7");
    }

    #[test]
    fn test_message_type_names() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        let jump = message_loop.find_message_type_id("Jump").unwrap();
        assert_eq!(message_loop.find_message_type_name(jump), Some("Jump"));
        assert_eq!(message_loop.find_message_type_name(MessageTypeId(99)), None);
        assert_eq!(message_loop.find_message_type_name(MessageTypeId::INVALID), None);
        assert_eq!(message_loop.find_message_type_id("Nope"), None);

        let frame = message_loop.register_message::<Frame>();
        assert_eq!(message_loop.find_message_type_id("Frame"), Some(frame));
    }

    #[test]
    fn test_find_system() {
        let log = Log::default();
        let mut message_loop = make_loop(&log);
        assert!(message_loop.find_system::<Player>().is_some());
        assert!(message_loop.find_system::<Ghost>().is_none());
        message_loop.find_system_mut::<Audio>().unwrap().log.borrow_mut().push("x".into());
        assert_eq!(take(&log), vec!["x"]);

        let player = message_loop.find_system_by_name("Player").unwrap();
        assert_eq!(message_loop.find_system_by_id(player.id), Some(player));
        assert!(message_loop.find_system_by_name("Ghost").is_none());
    }

    #[test]
    fn test_loops_do_not_share_type_ids() {
        let mut first = MessageLoop::new();
        let mut second = MessageLoop::new();
        assert_eq!(first.message_type_id::<Frame>(), MessageTypeId(1));
        assert_eq!(second.message_type_id::<Landed>(), MessageTypeId(1));
    }

    /// Raises an immediate event from its command handler; a peer answers
    /// with an immediate event of its own.
    struct Trigger {
        log: Log,
    }

    struct Echo {
        log: Log,
    }

    #[derive(Debug)]
    struct Ping;

    impl Event for Ping {
        fn type_name() -> &'static str {
            "Ping"
        }
    }

    #[derive(Debug)]
    struct Pong;

    impl Event for Pong {
        fn type_name() -> &'static str {
            "Pong"
        }
    }

    impl System for Trigger {
        fn type_name() -> &'static str {
            "Trigger"
        }

        fn initialize(&mut self, ctx: &mut Context<'_>) -> Dependencies {
            ctx.register_command::<Jump>();
            Dependencies::none()
        }

        fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
            if message.as_command::<Jump>().is_some() {
                ctx.dispatch_event(Ping);
                self.log.borrow_mut().push("trigger done".to_string());
            } else if message.as_event::<Pong>().is_some() {
                self.log.borrow_mut().push("trigger pong".to_string());
            }
        }
    }

    impl System for Echo {
        fn type_name() -> &'static str {
            "Echo"
        }

        fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
            if message.as_event::<Ping>().is_some() {
                self.log.borrow_mut().push("echo ping".to_string());
                // Trigger is still in its handler; it hears this afterwards.
                ctx.dispatch_event(Pong);
            }
        }
    }

    #[test]
    fn test_immediate_event_runs_nested() {
        let log = Log::default();
        let mut message_loop = MessageLoop::new();
        message_loop.create_system(Trigger { log: log.clone() }).unwrap();
        message_loop.create_system(Echo { log: log.clone() }).unwrap();
        message_loop.initialize().unwrap();

        let sink = log.clone();
        message_loop.create_listener(move |_, envelope| {
            sink.borrow_mut().push(format!("listener {}", envelope.message_type_name()));
        });

        message_loop.enqueue_command(Jump { height: 0 }).unwrap();
        message_loop.update().unwrap();
        assert_eq!(
            take(&log),
            vec![
                "echo ping",
                "listener Pong",
                "listener Ping",
                "trigger done",
                "trigger pong",
            ]
        );
    }

    /// Answers `Kick` with an immediate `Go`; records everything else.
    struct Kicker {
        log: Log,
    }

    /// Answers `Go` with an immediate `Back`.
    struct Relay {
        log: Log,
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Kick;

    impl Command for Kick {
        fn type_name() -> &'static str {
            "Kick"
        }
    }

    #[derive(Debug)]
    struct Go;

    impl Event for Go {
        fn type_name() -> &'static str {
            "Go"
        }
    }

    #[derive(Debug)]
    struct Back;

    impl Event for Back {
        fn type_name() -> &'static str {
            "Back"
        }
    }

    impl System for Kicker {
        fn type_name() -> &'static str {
            "Kicker"
        }

        fn initialize(&mut self, ctx: &mut Context<'_>) -> Dependencies {
            ctx.register_command::<Kick>();
            Dependencies::none()
        }

        fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
            if message.as_command::<Kick>().is_some() {
                ctx.dispatch_event(Go);
            } else if message.as_event::<Back>().is_some() {
                self.log.borrow_mut().push("kicker got Back".to_string());
            }
        }

        fn on_update(&mut self, _ctx: &mut Context<'_>) {
            self.log.borrow_mut().push("kicker update".to_string());
        }
    }

    impl System for Relay {
        fn type_name() -> &'static str {
            "Relay"
        }

        fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
            if message.as_event::<Go>().is_some() {
                self.log.borrow_mut().push("relay got Go".to_string());
                ctx.dispatch_event(Back);
            }
        }
    }

    #[test]
    fn test_immediate_reply_reaches_busy_system_before_update() {
        let log = Log::default();
        let mut message_loop = MessageLoop::new();
        message_loop.create_system(Kicker { log: log.clone() }).unwrap();
        message_loop.create_system(Relay { log: log.clone() }).unwrap();
        message_loop.initialize().unwrap();

        message_loop.enqueue_command(Kick).unwrap();
        message_loop.update().unwrap();
        assert_eq!(
            take(&log),
            vec!["relay got Go", "kicker got Back", "kicker update"]
        );
        assert_eq!(message_loop.pending_messages(), 0);
    }
}
