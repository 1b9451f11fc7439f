//! Resolves descriptors into links and curies.

use super::{CurieDescriptor, CurieDescriptors, LinkDescriptor};
use crate::context::LinkContext;
use crate::error::{LinkError, LinkResult};
use crate::link::{Curie, Link};
use serde_json::Value;
use std::sync::Arc;

/// Resolves descriptors in one [`LinkContext`] against one curie registry.
#[derive(Debug, Clone)]
pub struct LinkProvider<'a> {
    context: LinkContext<'a>,
    curies: Arc<CurieDescriptors>,
}

impl<'a> LinkProvider<'a> {
    /// Creates a provider without registered curies.
    pub fn new(context: LinkContext<'a>) -> Self {
        Self::with_curies(context, Arc::new(CurieDescriptors::new()))
    }

    /// Creates a provider for `context` and `curies`.
    pub fn with_curies(context: LinkContext<'a>, curies: Arc<CurieDescriptors>) -> Self {
        LinkProvider { context, curies }
    }

    /// Returns a provider scoped to `bean`, keeping the curie registry.
    pub fn for_bean(&self, bean: Value) -> Self {
        self.for_bean_with_curies(bean, Arc::clone(&self.curies))
    }

    /// Returns a provider scoped to `bean` with another curie registry.
    pub fn for_bean_with_curies(&self, bean: Value, curies: Arc<CurieDescriptors>) -> Self {
        LinkProvider {
            context: self.context.for_bean(bean),
            curies,
        }
    }

    /// The underlying context.
    pub fn context(&self) -> &LinkContext<'a> {
        &self.context
    }

    /// The curie registry.
    pub fn curies(&self) -> &Arc<CurieDescriptors> {
        &self.curies
    }

    /// Resolves `descriptor`, or `None` when its condition is false.
    ///
    /// A curie-prefixed rel requires its curie to be registered.
    pub fn get_link(&self, descriptor: &LinkDescriptor) -> LinkResult<Option<Link>> {
        let link = descriptor.to_link(&self.context)?;
        if link.is_some() {
            if let Some(curie) = descriptor.curie() {
                if !self.curies.contains(curie) {
                    return Err(LinkError::MissingCurie {
                        curie: curie.to_string(),
                        rel: descriptor.rel().to_string(),
                    });
                }
            }
        }
        Ok(link)
    }

    /// Resolves `descriptor`.
    pub fn get_curie(&self, descriptor: &CurieDescriptor) -> LinkResult<Curie> {
        descriptor.to_curie(&self.context)
    }
}
