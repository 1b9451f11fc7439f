#![deny(missing_docs)]

//! # Link Injection
//!
//! Entry point of the crate. A [`LinkInjector`] compiles the declarations of a
//! [`Resource`] type once, caches the resulting plan, and applies it to every
//! instance it is handed: links and curies are resolved against the instance
//! snapshot and written into the declared attributes, recursing into embedded
//! resources.
//!
//! - **plan**: plan steps, plan compilation and the per-type plan cache.

pub(crate) mod plan;

use crate::context::{LinkContext, StylingResolver, UriParameters, ENTITY, INSTANCE, URI};
use crate::descriptor::{LinkDescriptorFactory, LinkProvider};
use crate::error::LinkResult;
use crate::expression::{DefaultEvaluator, ExpressionEvaluator};
use crate::resource::{DynResource, Resource, TypeKey};
use crate::routes::{LinkTemplateFactory, LiteralLinkTemplateFactory};
use crate::template::{UriTemplateExpander, UriValueResolver};
use plan::PlanCache;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

const RESERVED: [&str; 3] = [ENTITY, INSTANCE, URI];

/// Injects links and curies into resources.
///
/// Cheap to share: all injection calls go through `&self` and the plan cache
/// supports concurrent readers.
pub struct LinkInjector {
    evaluator: Arc<dyn ExpressionEvaluator>,
    expander: UriTemplateExpander,
    cache: PlanCache,
}

impl std::fmt::Debug for LinkInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkInjector")
            .field("compiled_plans", &self.cache.compiled())
            .finish_non_exhaustive()
    }
}

impl Default for LinkInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkInjector {
    /// An injector with the default evaluator, literal link templates and no
    /// value resolvers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a builder.
    pub fn builder() -> LinkInjectorBuilder {
        LinkInjectorBuilder::default()
    }

    /// Number of plans compiled so far, root and element plans alike.
    pub fn compiled_plans(&self) -> usize {
        self.cache.compiled()
    }

    /// Injects the links of `entity`.
    pub fn inject_links<R: Resource>(
        &self,
        entity: &mut R,
        styler: &dyn StylingResolver,
    ) -> LinkResult<()> {
        self.inject_links_with(entity, styler, &UriParameters::new(), &Map::new())
    }

    /// Injects the links of `entity`, exposing the request URI parameters as
    /// `uri` and every entry of `identifiers` under its own name. Entries named
    /// `entity`, `instance` or `uri` are ignored.
    ///
    /// Declaration errors are reported on the first call for a type and on
    /// every later call for it, since failed plans are not cached.
    pub fn inject_links_with<R: Resource>(
        &self,
        entity: &mut R,
        styler: &dyn StylingResolver,
        uri_parameters: &UriParameters,
        identifiers: &Map<String, Value>,
    ) -> LinkResult<()> {
        let key = TypeKey::of::<R>();
        let plan = self.cache.root_plan(key)?;
        let Some(curies) = plan.curies() else {
            trace!(resource = key.name(), "nothing to inject");
            return Ok(());
        };

        let mut context = LinkContext::new(
            self.evaluator.as_ref(),
            &self.expander,
            styler,
            entity.snapshot()?,
        )
        .with_uri_parameters(uri_parameters);
        for (name, value) in identifiers {
            if RESERVED.contains(&name.as_str()) {
                trace!(identifier = name.as_str(), "reserved identifier ignored");
                continue;
            }
            context = context.with_identifier(name.clone(), value.clone());
        }

        let provider = LinkProvider::with_curies(context, Arc::clone(curies));
        plan.apply(entity, &provider, &self.cache)
    }
}

/// Builds a [`LinkInjector`].
#[derive(Default)]
pub struct LinkInjectorBuilder {
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    link_template_factory: Option<Arc<dyn LinkTemplateFactory>>,
    uri_value_resolvers: Vec<Arc<dyn UriValueResolver>>,
}

impl LinkInjectorBuilder {
    /// Replaces the default expression evaluator.
    pub fn expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Replaces the literal link template factory.
    pub fn link_template_factory(mut self, factory: Arc<dyn LinkTemplateFactory>) -> Self {
        self.link_template_factory = Some(factory);
        self
    }

    /// Sets the value resolvers used when expanding URI Templates.
    pub fn uri_value_resolvers<I>(mut self, resolvers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn UriValueResolver>>,
    {
        self.uri_value_resolvers = resolvers.into_iter().collect();
        self
    }

    /// Builds the injector.
    pub fn build(self) -> LinkInjector {
        let link_template_factory = self
            .link_template_factory
            .unwrap_or_else(|| Arc::new(LiteralLinkTemplateFactory));
        LinkInjector {
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(DefaultEvaluator::new())),
            expander: UriTemplateExpander::with_resolvers(self.uri_value_resolvers),
            cache: PlanCache::new(LinkDescriptorFactory::new(link_template_factory)),
        }
    }
}
