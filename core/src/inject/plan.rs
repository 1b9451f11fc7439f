//! Injection plans and the per-type plan cache.

use crate::declare::CurieDef;
use crate::descriptor::{
    CurieDescriptor, CurieDescriptors, DeclaringType, LinkDescriptor, LinkDescriptorFactory,
    LinkProvider,
};
use crate::error::{LinkError, LinkResult};
use crate::link::{Curie, Link};
use crate::resource::{
    AttributeAccessor, AttributeEntry, ContainerAccessor, Declaration, DynResource, LinkSpec,
    Slot, TypeKey,
};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One attribute write performed when a plan is applied.
pub(crate) enum Step {
    Link {
        accessor: Arc<dyn AttributeAccessor<Option<Link>>>,
        descriptor: LinkDescriptor,
    },
    LinkList {
        accessor: Arc<dyn AttributeAccessor<Vec<Link>>>,
        descriptors: Vec<LinkDescriptor>,
    },
    Curie {
        accessor: Arc<dyn AttributeAccessor<Option<Curie>>>,
        descriptor: CurieDescriptor,
    },
    CurieList {
        accessor: Arc<dyn AttributeAccessor<Vec<Curie>>>,
        descriptors: Vec<CurieDescriptor>,
    },
    Nested {
        accessor: Arc<dyn ContainerAccessor>,
    },
}

impl Step {
    fn apply(
        &self,
        instance: &mut dyn Any,
        provider: &LinkProvider<'_>,
        cache: &PlanCache,
    ) -> LinkResult<()> {
        match self {
            Step::Link { accessor, descriptor } => {
                if let Some(link) = provider.get_link(descriptor)? {
                    accessor.set(instance, Some(link))?;
                }
            }
            Step::LinkList {
                accessor,
                descriptors,
            } => {
                let mut links = Vec::with_capacity(descriptors.len());
                for descriptor in descriptors {
                    if let Some(link) = provider.get_link(descriptor)? {
                        links.push(link);
                    }
                }
                accessor.set(instance, links)?;
            }
            Step::Curie { accessor, descriptor } => {
                accessor.set(instance, Some(provider.get_curie(descriptor)?))?;
            }
            Step::CurieList {
                accessor,
                descriptors,
            } => {
                let curies = descriptors
                    .iter()
                    .map(|descriptor| provider.get_curie(descriptor))
                    .collect::<LinkResult<Vec<_>>>()?;
                accessor.set(instance, curies)?;
            }
            Step::Nested { accessor } => {
                accessor.for_each(instance, &mut |element: &mut dyn DynResource| -> LinkResult<()> {
                    let plan = cache.element_plan(element.type_key(), provider.curies())?;
                    if plan.is_noop() {
                        return Ok(());
                    }
                    let child = provider.for_bean(element.snapshot()?);
                    plan.apply(element.as_any_mut(), &child, cache)
                })?;
            }
        }
        Ok(())
    }
}

/// The compiled, immutable injection plan of one type.
pub(crate) enum Plan {
    /// Nothing to inject.
    NoOp,
    /// Plan of an entity passed to the injector, owning its curie registry.
    Root {
        curies: Arc<CurieDescriptors>,
        steps: Vec<Step>,
    },
    /// Plan of a resource reached through an embedded attribute.
    Element { steps: Vec<Step> },
}

impl Plan {
    pub(crate) fn is_noop(&self) -> bool {
        matches!(self, Plan::NoOp)
    }

    /// The curie registry a root plan resolves against.
    pub(crate) fn curies(&self) -> Option<&Arc<CurieDescriptors>> {
        match self {
            Plan::Root { curies, .. } => Some(curies),
            _ => None,
        }
    }

    /// Applies every step to `instance`. `provider` must already be scoped to
    /// `instance` and carry the registry of the enclosing root.
    pub(crate) fn apply(
        &self,
        instance: &mut dyn Any,
        provider: &LinkProvider<'_>,
        cache: &PlanCache,
    ) -> LinkResult<()> {
        let steps = match self {
            Plan::NoOp => return Ok(()),
            Plan::Root { steps, .. } | Plan::Element { steps } => steps,
        };
        for step in steps {
            step.apply(instance, provider, cache)?;
        }
        Ok(())
    }
}

type ElementKey = (TypeKey, Arc<CurieDescriptors>);

/// Compiles plans on first use and shares them afterwards.
///
/// Lookups take a read lock. A miss takes the write lock, checks again, then
/// compiles, so each key is compiled at most once.
pub(crate) struct PlanCache {
    factory: LinkDescriptorFactory,
    roots: RwLock<HashMap<TypeKey, Arc<Plan>>>,
    elements: RwLock<HashMap<ElementKey, Arc<Plan>>>,
    compiled: AtomicUsize,
}

impl PlanCache {
    pub(crate) fn new(factory: LinkDescriptorFactory) -> Self {
        PlanCache {
            factory,
            roots: RwLock::new(HashMap::new()),
            elements: RwLock::new(HashMap::new()),
            compiled: AtomicUsize::new(0),
        }
    }

    /// Number of plans compiled so far.
    pub(crate) fn compiled(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    pub(crate) fn root_plan(&self, key: TypeKey) -> LinkResult<Arc<Plan>> {
        if let Some(plan) = self.roots.read().get(&key) {
            return Ok(Arc::clone(plan));
        }
        let mut roots = self.roots.write();
        if let Some(plan) = roots.get(&key) {
            return Ok(Arc::clone(plan));
        }
        let plan = Arc::new(self.compile_root(key)?);
        roots.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    pub(crate) fn element_plan(
        &self,
        key: TypeKey,
        curies: &Arc<CurieDescriptors>,
    ) -> LinkResult<Arc<Plan>> {
        let element_key = (key, Arc::clone(curies));
        if let Some(plan) = self.elements.read().get(&element_key) {
            return Ok(Arc::clone(plan));
        }
        let mut elements = self.elements.write();
        if let Some(plan) = elements.get(&element_key) {
            return Ok(Arc::clone(plan));
        }
        let plan = Arc::new(self.compile_element(key, curies)?);
        elements.insert(element_key, Arc::clone(&plan));
        Ok(plan)
    }

    fn compile_root(&self, key: TypeKey) -> LinkResult<Plan> {
        let declaration = key.declaration();
        let mut curie_defs = Vec::new();
        collect_curie_defs(&declaration, &mut curie_defs);
        let curies = Arc::new(self.factory.create_curie_descriptors(curie_defs)?);

        let steps = self.compile_steps(&declaration, true, &curies)?;
        self.compiled.fetch_add(1, Ordering::Relaxed);
        debug!(
            resource = key.name(),
            steps = steps.len(),
            curies = curies.len(),
            "compiled root injection plan"
        );
        Ok(if steps.is_empty() {
            Plan::NoOp
        } else {
            Plan::Root { curies, steps }
        })
    }

    fn compile_element(&self, key: TypeKey, curies: &CurieDescriptors) -> LinkResult<Plan> {
        let declaration = key.declaration();
        let steps = self.compile_steps(&declaration, false, curies)?;
        self.compiled.fetch_add(1, Ordering::Relaxed);
        debug!(
            resource = key.name(),
            steps = steps.len(),
            "compiled element injection plan"
        );
        Ok(if steps.is_empty() {
            Plan::NoOp
        } else {
            Plan::Element { steps }
        })
    }

    fn compile_steps(
        &self,
        declaration: &Declaration,
        root: bool,
        curies: &CurieDescriptors,
    ) -> LinkResult<Vec<Step>> {
        let mut walk = Walk {
            factory: &self.factory,
            root,
            curies,
            seen: HashSet::new(),
            rels: HashSet::new(),
            curie_names: HashSet::new(),
            steps: Vec::new(),
        };
        walk.declaration(declaration)?;
        Ok(walk.steps)
    }
}

/// Curie declarations of the hierarchy, root-most supertype first.
fn collect_curie_defs<'d>(declaration: &'d Declaration, out: &mut Vec<&'d CurieDef>) {
    if let Some(supertype) = &declaration.supertype {
        collect_curie_defs(supertype, out);
    }
    for attribute in declaration.attributes.iter().filter(|a| !a.is_static) {
        match &attribute.spec {
            Some(LinkSpec::CurieDef(def)) => out.push(def),
            Some(LinkSpec::CurieDefs(defs)) => out.extend(defs.0.iter()),
            _ => {}
        }
    }
}

/// State of one walk over a type hierarchy.
struct Walk<'w> {
    factory: &'w LinkDescriptorFactory,
    root: bool,
    curies: &'w CurieDescriptors,
    seen: HashSet<String>,
    rels: HashSet<String>,
    curie_names: HashSet<String>,
    steps: Vec<Step>,
}

impl Walk<'_> {
    /// Visits the attributes of `declaration`, then its supertype. An
    /// attribute shadows supertype attributes of the same name.
    fn declaration(&mut self, declaration: &Declaration) -> LinkResult<()> {
        for attribute in &declaration.attributes {
            if attribute.is_static || self.seen.contains(&attribute.name) {
                continue;
            }
            if let Some(step) = self.step(declaration, attribute)? {
                self.steps.push(step);
            }
            self.seen.insert(attribute.name.clone());
        }
        if let Some(supertype) = &declaration.supertype {
            self.declaration(supertype)?;
        }
        Ok(())
    }

    fn step(
        &mut self,
        declaration: &Declaration,
        attribute: &AttributeEntry,
    ) -> LinkResult<Option<Step>> {
        let declaring = DeclaringType {
            name: &declaration.name,
            properties: &declaration.properties,
        };
        let step = match (&attribute.spec, &attribute.slot) {
            (Some(LinkSpec::LinkRel(link_rel)), Slot::Link(accessor)) => {
                let descriptor = self.factory.create_link_descriptor(declaring, link_rel)?;
                self.check_curie(&descriptor)?;
                self.claim_rel(&descriptor, declaring.name)?;
                Step::Link {
                    accessor: Arc::clone(accessor),
                    descriptor,
                }
            }
            (Some(LinkSpec::LinkRels(link_rels)), Slot::LinkList(accessor)) => {
                let descriptors = self.factory.create_link_descriptors(declaring, link_rels)?;
                for descriptor in &descriptors {
                    self.check_curie(descriptor)?;
                    self.claim_rel(descriptor, declaring.name)?;
                }
                Step::LinkList {
                    accessor: Arc::clone(accessor),
                    descriptors,
                }
            }
            (Some(LinkSpec::CurieDef(_) | LinkSpec::CurieDefs(_)), _) if !self.root => {
                return Ok(None);
            }
            (Some(LinkSpec::CurieDef(curie_def)), Slot::Curie(accessor)) => {
                let descriptor = self.factory.create_curie_descriptor(curie_def)?;
                self.claim_curie(&descriptor, declaring.name)?;
                Step::Curie {
                    accessor: Arc::clone(accessor),
                    descriptor,
                }
            }
            (Some(LinkSpec::CurieDefs(curie_defs)), Slot::CurieList(accessor)) => {
                let descriptors = self.factory.create_curie_descriptor_list(curie_defs)?;
                for descriptor in &descriptors {
                    self.claim_curie(descriptor, declaring.name)?;
                }
                Step::CurieList {
                    accessor: Arc::clone(accessor),
                    descriptors,
                }
            }
            (Some(spec), _) => {
                return Err(LinkError::TypeMismatch {
                    attribute: attribute.name.clone(),
                    owner: declaration.name.clone(),
                    expected: spec.expected_kind().to_string(),
                    found: attribute.kind.to_string(),
                });
            }
            (None, Slot::Container(accessor)) => Step::Nested {
                accessor: Arc::clone(accessor),
            },
            (None, _) => return Ok(None),
        };
        Ok(Some(step))
    }

    fn check_curie(&self, descriptor: &LinkDescriptor) -> LinkResult<()> {
        match descriptor.curie() {
            Some(curie) if !self.curies.contains(curie) => Err(LinkError::MissingCurie {
                curie: curie.to_string(),
                rel: descriptor.rel().to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn claim_curie(&mut self, descriptor: &CurieDescriptor, owner: &str) -> LinkResult<()> {
        if self.curie_names.insert(descriptor.name().to_string()) {
            Ok(())
        } else {
            Err(LinkError::DuplicateCurie {
                name: descriptor.name().to_string(),
                owner: owner.to_string(),
            })
        }
    }

    fn claim_rel(&mut self, descriptor: &LinkDescriptor, owner: &str) -> LinkResult<()> {
        if self.rels.insert(descriptor.rel().to_string()) {
            Ok(())
        } else {
            Err(LinkError::DuplicateRel {
                rel: descriptor.rel().to_string(),
                owner: owner.to_string(),
            })
        }
    }
}
