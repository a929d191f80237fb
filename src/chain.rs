use std::{fmt, sync::Arc};

use crate::{
    context::{ContextValues, FilterContext},
    error_sink::ErrorSink,
    network::Network,
    path::NodePath,
};

/// One step of a filter chain.
///
/// A filter rewrites `network` in place for the target backend. Problems are
/// reported through `errors`; a filter never stops the chain.
/// `network_id` names the whole network and is the parent scope for any node
/// the filter creates.
pub trait Filter: Send + Sync {
    fn apply(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context: &FilterContext<'_>,
        errors: &mut ErrorSink<'_>,
    );

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T: Filter + ?Sized> Filter for Arc<T> {
    fn apply(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context: &FilterContext<'_>,
        errors: &mut ErrorSink<'_>,
    ) {
        (**self).apply(network_id, network, context, errors)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Filter backed by a closure. Build with [`filter_fn`].
pub struct FnFilter<F> {
    name: String,
    f: F,
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&NodePath, &mut Network, &FilterContext<'_>, &mut ErrorSink<'_>) + Send + Sync,
{
    fn apply(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context: &FilterContext<'_>,
        errors: &mut ErrorSink<'_>,
    ) {
        (self.f)(network_id, network, context, errors)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn filter_fn<F>(name: impl Into<String>, f: F) -> FnFilter<F>
where
    F: Fn(&NodePath, &mut Network, &FilterContext<'_>, &mut ErrorSink<'_>) + Send + Sync,
{
    FnFilter {
        name: name.into(),
        f,
    }
}

/// Outcome of [`FilterChain::exec_with_report`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChainReport {
    pub filters_run: usize,
    pub errors: Vec<String>,
}

impl FilterChainReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ordered sequence of filters applied to a network.
///
/// The chain keeps no per-execution state, so one chain may run against
/// several networks at once from different threads.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter` after every filter appended so far.
    pub fn append_filter(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.append_filter(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.name())
    }

    /// Runs every filter, in append order, on `network`.
    ///
    /// Filter errors go to `output_error_messages` when given and are dropped
    /// otherwise. Earlier errors never prevent later filters from running.
    pub fn exec(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context_values: &ContextValues,
        shader_type_priority: &[String],
        output_error_messages: Option<&mut Vec<String>>,
    ) {
        let context = FilterContext::new(context_values, shader_type_priority);
        let mut errors = ErrorSink::new(output_error_messages);
        self.exec_in(network_id, network, &context, &mut errors);
    }

    /// Like [`exec`](Self::exec), always collecting errors.
    pub fn exec_with_report(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context_values: &ContextValues,
        shader_type_priority: &[String],
    ) -> FilterChainReport {
        let mut messages = Vec::new();
        let context = FilterContext::new(context_values, shader_type_priority);
        let mut errors = ErrorSink::new(Some(&mut messages));
        let filters_run = self.exec_in(network_id, network, &context, &mut errors);
        FilterChainReport {
            filters_run,
            errors: messages,
        }
    }

    fn exec_in(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context: &FilterContext<'_>,
        errors: &mut ErrorSink<'_>,
    ) -> usize {
        for (index, filter) in self.filters.iter().enumerate() {
            let errors_before = errors.len();
            log::debug!("{network_id}: filter {index} ({}) start", filter.name());
            filter.apply(network_id, network, context, errors);
            log::trace!(
                "{network_id}: filter {index} done, {} nodes, {} terminals, {} new errors",
                network.node_count(),
                network.terminals.len(),
                errors.len() - errors_before,
            );
        }
        self.filters.len()
    }
}

// A chain nests inside another chain as a single step.
impl Filter for FilterChain {
    fn apply(
        &self,
        network_id: &NodePath,
        network: &mut Network,
        context: &FilterContext<'_>,
        errors: &mut ErrorSink<'_>,
    ) {
        self.exec_in(network_id, network, context, errors);
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filter_names().collect::<Vec<_>>())
            .finish()
    }
}
