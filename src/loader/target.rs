//! Bind targets
//!
//! A target supplies the structure a pass resolves into and receives it back
//! together with the pass result.

use std::sync::Arc;

use tokio::sync::watch;

use crate::binding::{Bindable, ResolveResult, Resolver};

/// Receiver of bound configuration
pub trait Target: Send + 'static {
    type Config: Bindable + Send + 'static;

    /// Returns the structure one pass resolves into; fields the sources do
    /// not provide keep the values it starts with
    fn new_snapshot(&self) -> Self::Config;

    /// Completion callback, invoked once per pass with the (possibly
    /// partially) populated structure
    fn set_snapshot(&self, config: Self::Config, result: ResolveResult<()>);
}

impl<T: Target + Sync> Target for Arc<T> {
    type Config = T::Config;

    fn new_snapshot(&self) -> Self::Config {
        self.as_ref().new_snapshot()
    }

    fn set_snapshot(&self, config: Self::Config, result: ResolveResult<()>) {
        self.as_ref().set_snapshot(config, result)
    }
}

/// Type-erased target held by the loader task
pub(crate) trait DynTarget: Send {
    /// Runs one pass and hands the result to the target
    fn pass(&self, resolver: &Resolver<'_>) -> ResolveResult<()>;
}

impl<T: Target> DynTarget for T {
    fn pass(&self, resolver: &Resolver<'_>) -> ResolveResult<()> {
        let mut config = self.new_snapshot();
        let result = resolver.resolve_target(&mut config);
        self.set_snapshot(config, result.clone());
        result
    }
}

/// One committed pass of a [`ConfigCell`]
#[derive(Debug, Clone)]
pub struct Revision<C> {
    pub config: C,
    /// Error of the pass that produced `config`
    pub error: Option<crate::binding::ResolveError>,
    /// Passes committed so far; 0 before the first bind
    pub number: u64,
}

/// Ready-made target holding the latest configuration.
///
/// Every pass starts from the last committed value. Readers either poll
/// [`ConfigCell::current`] or await changes on [`ConfigCell::subscribe`].
#[derive(Debug)]
pub struct ConfigCell<C> {
    state: watch::Sender<Revision<C>>,
}

impl<C: Clone> ConfigCell<C> {
    /// Creates a cell whose first pass starts from `initial`
    pub fn new(initial: C) -> Self {
        let (state, _) = watch::channel(Revision {
            config: initial,
            error: None,
            number: 0,
        });
        Self { state }
    }

    /// Returns the latest revision
    pub fn current(&self) -> Revision<C> {
        self.state.borrow().clone()
    }

    /// Returns the latest configuration
    pub fn config(&self) -> C {
        self.state.borrow().config.clone()
    }

    /// Subscribes to committed revisions
    pub fn subscribe(&self) -> watch::Receiver<Revision<C>> {
        self.state.subscribe()
    }
}

impl<C: Default + Clone> Default for ConfigCell<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> Target for ConfigCell<C>
where
    C: Bindable + Clone + Send + Sync + 'static,
{
    type Config = C;

    fn new_snapshot(&self) -> C {
        self.state.borrow().config.clone()
    }

    fn set_snapshot(&self, config: C, result: ResolveResult<()>) {
        self.state.send_modify(|revision| {
            revision.config = config;
            revision.error = result.err();
            revision.number += 1;
        });
    }
}
