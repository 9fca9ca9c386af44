//! The `Context` is the simulation object: it holds every component's data in
//! type-keyed *data plugins*, tracks the current tick, and stores plans that run
//! at the start of a future tick.
use std::any::{Any, TypeId};

use log::trace;

use crate::error::SimError;
use crate::plan::{Id as PlanId, Queue};
use crate::HashMap;

/// A trait for objects that can provide data containers to be held by `Context`
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in Context.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

type Callback = dyn FnOnce(&mut Context);

pub struct Context {
    plan_queue: Queue<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_tick: u64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            data_plugins: HashMap::default(),
            current_tick: 0,
            shutdown_requested: false,
        }
    }

    /// Schedules `callback` to run at the start of `tick`, before that tick's
    /// snapshot is published.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is earlier than the current tick.
    pub fn add_plan(&mut self, tick: u64, callback: impl FnOnce(&mut Context) + 'static) -> PlanId {
        assert!(
            tick >= self.current_tick,
            "Plan tick {tick} is before the current tick {}",
            self.current_tick
        );
        self.plan_queue.add_plan(tick, Box::new(callback))
    }

    /// Cancels a pending plan. Returns `false` if it already ran or was cancelled.
    pub fn cancel_plan(&mut self, id: &PlanId) -> bool {
        self.plan_queue.cancel_plan(id)
    }

    /// Runs every plan due at the current tick, including plans added by
    /// those plans for the same tick.
    pub fn run_due_plans(&mut self) {
        while let Some(plan) = self.plan_queue.get_next_plan_due(self.current_tick) {
            trace!("running plan scheduled for tick {}", plan.tick);
            (plan.data)(self);
        }
    }

    /// Returns a mutable reference to the data container for `T`, creating it
    /// from its default if it does not exist yet.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T::DataContainer>())
    }

    /// Like `get_data_container`, but treats a missing container as an error
    /// for components that must have been initialized first.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` naming the plugin if its container was never created.
    pub fn get_data<T: DataPlugin>(&self, plugin: T) -> Result<&T::DataContainer, SimError> {
        self.get_data_container(plugin).ok_or_else(|| {
            SimError::SimError(format!(
                "{} has not been initialized",
                std::any::type_name::<T>()
            ))
        })
    }

    #[must_use]
    pub fn get_current_tick(&self) -> u64 {
        self.current_tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Requests that `execute` stop before the next tick begins.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at tick {}", self.current_tick);
        self.shutdown_requested = true;
    }

    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
