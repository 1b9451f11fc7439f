#![deny(missing_docs)]

//! # Resources
//!
//! Runtime description of the types links are injected into. A type opts in
//! by implementing [`Resource`] and listing its attributes in a
//! [`TypeDeclaration`]: which attributes hold links or curies, which hold
//! embedded resources, the specification attached to each one, the property
//! names readable through `${instance.<name>}`, and the supertype it extends.
//!
//! ```
//! use hal_links_core::declare::LinkRel;
//! use hal_links_core::link::Link;
//! use hal_links_core::resource::{Attribute, Resource, TypeDeclaration};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: u32,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     self_link: Option<Link>,
//! }
//!
//! impl Resource for Order {
//!     fn declare() -> TypeDeclaration<Self> {
//!         TypeDeclaration::new().property("id").attribute(
//!             Attribute::link("self_link", |o: &mut Order| &mut o.self_link)
//!                 .with(LinkRel::self_link("/orders/{id}").binding("id", "${instance.id}")),
//!         )
//!     }
//! }
//! ```

use crate::declare::{CurieDef, CurieDefs, LinkRel, LinkRels};
use crate::error::LinkResult;
use crate::link::{Curie, Embedded, Link};
use derive_more::{Display, From};
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// A type whose links and curies can be injected.
///
/// The serialized form is the snapshot expressions read through `entity` and
/// `instance`.
pub trait Resource: Serialize + Send + Sync + Sized + 'static {
    /// Describes the attributes of this type.
    fn declare() -> TypeDeclaration<Self>;
}

/// Object-safe view of a [`Resource`], used while walking embedded resources.
pub trait DynResource: Send + Sync {
    /// The runtime type of this resource.
    fn type_key(&self) -> TypeKey;

    /// The JSON snapshot read by expressions.
    fn snapshot(&self) -> Result<Value, AccessError>;

    /// Upcasts for attribute access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Resource> DynResource for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn snapshot(&self) -> Result<Value, AccessError> {
        serde_json::to_value(self)
            .map_err(|e| AccessError::new(short_type_name::<T>(), None, e.to_string()))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Identity of a resource type, and the way to obtain its declaration.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    declare: fn() -> Declaration,
}

impl TypeKey {
    /// The key of `T`.
    pub fn of<T: Resource>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
            declare: declaration_of::<T>,
        }
    }

    /// The type name, without its module path.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn declaration(&self) -> Declaration {
        (self.declare)()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn declaration_of<T: Resource>() -> Declaration {
    T::declare().declaration
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Reading or writing an attribute failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessError {
    owner: String,
    attribute: Option<String>,
    message: String,
}

impl AccessError {
    /// Creates an access error on `owner`, optionally naming the attribute.
    pub fn new(
        owner: impl Into<String>,
        attribute: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        AccessError {
            owner: owner.into(),
            attribute: attribute.map(str::to_string),
            message: message.into(),
        }
    }

    /// The type being accessed.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The attribute being accessed, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(
                f,
                "Could not access '{}' on {}: {}",
                attribute, self.owner, self.message
            ),
            None => write!(f, "Could not access {}: {}", self.owner, self.message),
        }
    }
}

impl std::error::Error for AccessError {}

/// Reads and writes one attribute of a type-erased instance.
pub trait AttributeAccessor<V>: Send + Sync {
    /// Borrows the attribute of `instance`.
    fn get_mut<'r>(&self, instance: &'r mut dyn Any) -> Result<&'r mut V, AccessError>;

    /// Overwrites the attribute of `instance`.
    fn set(&self, instance: &mut dyn Any, value: V) -> Result<(), AccessError> {
        *self.get_mut(instance)? = value;
        Ok(())
    }
}

/// Accesses an attribute of `T` through a projection function.
pub struct FieldAccessor<T, V> {
    attribute: String,
    get: fn(&mut T) -> &mut V,
}

impl<T: 'static, V> FieldAccessor<T, V> {
    /// Creates an accessor named `attribute`.
    pub fn new(attribute: impl Into<String>, get: fn(&mut T) -> &mut V) -> Self {
        FieldAccessor {
            attribute: attribute.into(),
            get,
        }
    }
}

impl<T: 'static, V> AttributeAccessor<V> for FieldAccessor<T, V> {
    fn get_mut<'r>(&self, instance: &'r mut dyn Any) -> Result<&'r mut V, AccessError> {
        downcast::<T>(instance, &self.attribute).map(self.get)
    }
}

/// Reaches a supertype attribute through the projection from `T` to `P`.
struct ProjectedAccessor<T, P, V> {
    attribute: String,
    project: fn(&mut T) -> &mut P,
    inner: Arc<dyn AttributeAccessor<V>>,
}

impl<T: 'static, P: 'static, V> AttributeAccessor<V> for ProjectedAccessor<T, P, V> {
    fn get_mut<'r>(&self, instance: &'r mut dyn Any) -> Result<&'r mut V, AccessError> {
        let parent = (self.project)(downcast::<T>(instance, &self.attribute)?);
        self.inner.get_mut(parent)
    }
}

fn downcast<'r, T: 'static>(
    instance: &'r mut dyn Any,
    attribute: &str,
) -> Result<&'r mut T, AccessError> {
    instance.downcast_mut::<T>().ok_or_else(|| {
        AccessError::new(
            short_type_name::<T>(),
            Some(attribute),
            "instance is of another type",
        )
    })
}

/// Callback receiving each resource found in a container attribute.
pub type Visit<'v> = dyn FnMut(&mut dyn DynResource) -> LinkResult<()> + 'v;

/// Walks the resources held by an embedded or embeddable attribute.
pub trait ContainerAccessor: Send + Sync {
    /// Calls `visit` for each contained resource. Absent containers and empty
    /// lists call nothing.
    fn for_each(&self, instance: &mut dyn Any, visit: &mut Visit<'_>) -> LinkResult<()>;
}

struct Contents<V> {
    accessor: Arc<dyn AttributeAccessor<V>>,
    each: fn(&mut V, &mut Visit<'_>) -> LinkResult<()>,
}

impl<V: 'static> ContainerAccessor for Contents<V> {
    fn for_each(&self, instance: &mut dyn Any, visit: &mut Visit<'_>) -> LinkResult<()> {
        (self.each)(self.accessor.get_mut(instance)?, visit)
    }
}

struct ProjectedContainer<T, P> {
    attribute: String,
    project: fn(&mut T) -> &mut P,
    inner: Arc<dyn ContainerAccessor>,
}

impl<T: 'static, P: 'static> ContainerAccessor for ProjectedContainer<T, P> {
    fn for_each(&self, instance: &mut dyn Any, visit: &mut Visit<'_>) -> LinkResult<()> {
        let parent = (self.project)(downcast::<T>(instance, &self.attribute)?);
        self.inner.for_each(parent, visit)
    }
}

fn each_embedded<E: Resource>(
    container: &mut Option<Embedded<E>>,
    visit: &mut Visit<'_>,
) -> LinkResult<()> {
    match container {
        Some(embedded) => visit(embedded.resource_mut()),
        None => Ok(()),
    }
}

fn each_embedded_list<E: Resource>(
    container: &mut Option<Embedded<Vec<E>>>,
    visit: &mut Visit<'_>,
) -> LinkResult<()> {
    if let Some(embedded) = container {
        for resource in embedded.resource_mut() {
            visit(resource)?;
        }
    }
    Ok(())
}

fn each_embeddable<E: Resource>(resource: &mut E, visit: &mut Visit<'_>) -> LinkResult<()> {
    visit(resource)
}

/// A specification attached to an attribute.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum LinkSpec {
    /// One link.
    LinkRel(LinkRel),
    /// An ordered group of links.
    LinkRels(LinkRels),
    /// One curie.
    CurieDef(CurieDef),
    /// An ordered group of curies.
    CurieDefs(CurieDefs),
}

impl LinkSpec {
    /// The attribute kind this specification must be attached to.
    pub fn expected_kind(&self) -> AttributeKind {
        match self {
            LinkSpec::LinkRel(_) => AttributeKind::Link,
            LinkSpec::LinkRels(_) => AttributeKind::LinkList,
            LinkSpec::CurieDef(_) => AttributeKind::Curie,
            LinkSpec::CurieDefs(_) => AttributeKind::CurieList,
        }
    }
}

/// The shape of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AttributeKind {
    /// `Option<Link>`.
    #[display("Option<Link>")]
    Link,
    /// `Vec<Link>`.
    #[display("Vec<Link>")]
    LinkList,
    /// `Option<Curie>`.
    #[display("Option<Curie>")]
    Curie,
    /// `Vec<Curie>`.
    #[display("Vec<Curie>")]
    CurieList,
    /// An optional [`Embedded`] container of one or many resources.
    #[display("Embedded")]
    Embedded,
    /// A resource held directly.
    #[display("Embeddable")]
    Embeddable,
    /// Anything else, by type name.
    #[display("{_0}")]
    Other(&'static str),
}

#[derive(Clone)]
pub(crate) enum Slot {
    Link(Arc<dyn AttributeAccessor<Option<Link>>>),
    LinkList(Arc<dyn AttributeAccessor<Vec<Link>>>),
    Curie(Arc<dyn AttributeAccessor<Option<Curie>>>),
    CurieList(Arc<dyn AttributeAccessor<Vec<Curie>>>),
    Container(Arc<dyn ContainerAccessor>),
    Other,
}

impl Slot {
    fn project<T: 'static, P: 'static>(self, attribute: &str, project: fn(&mut T) -> &mut P) -> Self {
        fn lift<T: 'static, P: 'static, V: 'static>(
            attribute: &str,
            project: fn(&mut T) -> &mut P,
            inner: Arc<dyn AttributeAccessor<V>>,
        ) -> Arc<dyn AttributeAccessor<V>> {
            Arc::new(ProjectedAccessor {
                attribute: attribute.to_string(),
                project,
                inner,
            })
        }

        match self {
            Slot::Link(inner) => Slot::Link(lift(attribute, project, inner)),
            Slot::LinkList(inner) => Slot::LinkList(lift(attribute, project, inner)),
            Slot::Curie(inner) => Slot::Curie(lift(attribute, project, inner)),
            Slot::CurieList(inner) => Slot::CurieList(lift(attribute, project, inner)),
            Slot::Container(inner) => Slot::Container(Arc::new(ProjectedContainer {
                attribute: attribute.to_string(),
                project,
                inner,
            })),
            Slot::Other => Slot::Other,
        }
    }
}

/// Type-erased attribute, as stored in a [`Declaration`].
#[derive(Clone)]
pub(crate) struct AttributeEntry {
    pub(crate) name: String,
    pub(crate) kind: AttributeKind,
    pub(crate) is_static: bool,
    pub(crate) spec: Option<LinkSpec>,
    pub(crate) slot: Slot,
}

/// One attribute of `T`.
pub struct Attribute<T> {
    entry: AttributeEntry,
    _owner: PhantomData<fn(&mut T)>,
}

impl<T: 'static> Attribute<T> {
    fn from_slot(name: impl Into<String>, kind: AttributeKind, slot: Slot) -> Self {
        Attribute {
            entry: AttributeEntry {
                name: name.into(),
                kind,
                is_static: false,
                spec: None,
                slot,
            },
            _owner: PhantomData,
        }
    }

    /// A single link attribute.
    pub fn link(name: impl Into<String>, get: fn(&mut T) -> &mut Option<Link>) -> Self {
        let name = name.into();
        let accessor = Arc::new(FieldAccessor::new(name.clone(), get));
        Self::from_slot(name, AttributeKind::Link, Slot::Link(accessor))
    }

    /// A link list attribute.
    pub fn link_list(name: impl Into<String>, get: fn(&mut T) -> &mut Vec<Link>) -> Self {
        let name = name.into();
        let accessor = Arc::new(FieldAccessor::new(name.clone(), get));
        Self::from_slot(name, AttributeKind::LinkList, Slot::LinkList(accessor))
    }

    /// A single curie attribute.
    pub fn curie(name: impl Into<String>, get: fn(&mut T) -> &mut Option<Curie>) -> Self {
        let name = name.into();
        let accessor = Arc::new(FieldAccessor::new(name.clone(), get));
        Self::from_slot(name, AttributeKind::Curie, Slot::Curie(accessor))
    }

    /// A curie list attribute.
    pub fn curie_list(name: impl Into<String>, get: fn(&mut T) -> &mut Vec<Curie>) -> Self {
        let name = name.into();
        let accessor = Arc::new(FieldAccessor::new(name.clone(), get));
        Self::from_slot(name, AttributeKind::CurieList, Slot::CurieList(accessor))
    }

    /// An embedded resource.
    pub fn embedded<E: Resource>(
        name: impl Into<String>,
        get: fn(&mut T) -> &mut Option<Embedded<E>>,
    ) -> Self {
        Self::container(name, AttributeKind::Embedded, get, each_embedded::<E>)
    }

    /// An embedded list of resources.
    pub fn embedded_list<E: Resource>(
        name: impl Into<String>,
        get: fn(&mut T) -> &mut Option<Embedded<Vec<E>>>,
    ) -> Self {
        Self::container(name, AttributeKind::Embedded, get, each_embedded_list::<E>)
    }

    /// A resource held directly, without an [`Embedded`] wrapper.
    pub fn embeddable<E: Resource>(name: impl Into<String>, get: fn(&mut T) -> &mut E) -> Self {
        Self::container(name, AttributeKind::Embeddable, get, each_embeddable::<E>)
    }

    fn container<V: 'static>(
        name: impl Into<String>,
        kind: AttributeKind,
        get: fn(&mut T) -> &mut V,
        each: fn(&mut V, &mut Visit<'_>) -> LinkResult<()>,
    ) -> Self {
        let name = name.into();
        let accessor: Arc<dyn AttributeAccessor<V>> = Arc::new(FieldAccessor::new(name.clone(), get));
        let contents = Contents { accessor, each };
        Self::from_slot(name, kind, Slot::Container(Arc::new(contents)))
    }

    /// Any other attribute. It only matters if a specification is attached
    /// by mistake.
    pub fn other(name: impl Into<String>, type_name: &'static str) -> Self {
        Self::from_slot(name, AttributeKind::Other(type_name), Slot::Other)
    }

    /// Attaches a specification.
    pub fn with(mut self, spec: impl Into<LinkSpec>) -> Self {
        self.entry.spec = Some(spec.into());
        self
    }

    /// Marks the attribute as static. Static attributes are never injected.
    pub fn as_static(mut self) -> Self {
        self.entry.is_static = true;
        self
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// The attribute kind.
    pub fn kind(&self) -> AttributeKind {
        self.entry.kind
    }

    /// The attached specification.
    pub fn spec(&self) -> Option<&LinkSpec> {
        self.entry.spec.as_ref()
    }
}

/// Type-erased declaration of one level of a type hierarchy.
#[derive(Clone)]
pub(crate) struct Declaration {
    pub(crate) name: String,
    pub(crate) properties: IndexSet<String>,
    pub(crate) attributes: Vec<AttributeEntry>,
    pub(crate) supertype: Option<Box<Declaration>>,
}

impl Declaration {
    fn project<T: 'static, P: 'static>(self, project: fn(&mut T) -> &mut P) -> Self {
        Declaration {
            name: self.name,
            properties: self.properties,
            attributes: self
                .attributes
                .into_iter()
                .map(|entry| AttributeEntry {
                    slot: entry.slot.project(&entry.name, project),
                    ..entry
                })
                .collect(),
            supertype: self.supertype.map(|s| Box::new(s.project(project))),
        }
    }
}

/// The attributes, readable properties and supertype of `T`.
pub struct TypeDeclaration<T> {
    declaration: Declaration,
    _owner: PhantomData<fn(&mut T)>,
}

impl<T: 'static> Default for TypeDeclaration<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> TypeDeclaration<T> {
    /// An empty declaration named after `T`.
    pub fn new() -> Self {
        TypeDeclaration {
            declaration: Declaration {
                name: short_type_name::<T>().to_string(),
                properties: IndexSet::new(),
                attributes: Vec::new(),
                supertype: None,
            },
            _owner: PhantomData,
        }
    }

    /// Overrides the name used in error messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.declaration.name = name.into();
        self
    }

    /// Adds a property readable through `${instance.<name>}`.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.declaration.properties.insert(name.into());
        self
    }

    /// Adds several readable properties.
    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declaration
            .properties
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds an attribute. Declaration order is injection order.
    pub fn attribute(mut self, attribute: Attribute<T>) -> Self {
        self.declaration.attributes.push(attribute.entry);
        self
    }

    /// Declares `P` as the supertype, reached through `project`.
    ///
    /// The supertype is expected to be `#[serde(flatten)]`-ed into `T`, so its
    /// readable properties are readable on `T` as well.
    pub fn extends<P: Resource>(mut self, project: fn(&mut T) -> &mut P) -> Self {
        let parent = P::declare().declaration.project(project);
        for property in &parent.properties {
            self.declaration.properties.insert(property.clone());
        }
        self.declaration.supertype = Some(Box::new(parent));
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// The readable properties, including those of supertypes.
    pub fn readable_properties(&self) -> &IndexSet<String> {
        &self.declaration.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize, Default)]
    struct Base {
        id: u32,
        #[serde(skip)]
        links: Vec<Link>,
    }

    impl Resource for Base {
        fn declare() -> TypeDeclaration<Self> {
            TypeDeclaration::new()
                .property("id")
                .attribute(Attribute::link_list("links", |b: &mut Base| &mut b.links))
        }
    }

    #[derive(Serialize, Default)]
    struct Item {
        #[serde(flatten)]
        base: Base,
        name: String,
        #[serde(skip)]
        self_link: Option<Link>,
        #[serde(skip)]
        children: Option<Embedded<Vec<Item>>>,
    }

    impl Resource for Item {
        fn declare() -> TypeDeclaration<Self> {
            TypeDeclaration::new()
                .property("name")
                .attribute(Attribute::link("self_link", |i: &mut Item| &mut i.self_link))
                .attribute(Attribute::embedded_list("children", |i: &mut Item| {
                    &mut i.children
                }))
                .extends(|i: &mut Item| &mut i.base)
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Item>(), "Item");
        assert!(short_type_name::<Vec<Item>>().starts_with("Vec<"));
        assert_eq!(TypeKey::of::<Item>().name(), "Item");
        assert_eq!(TypeKey::of::<Item>(), TypeKey::of::<Item>());
        assert!(TypeKey::of::<Item>() != TypeKey::of::<Base>());
    }

    #[test]
    fn test_supertype_properties_merged() {
        let declaration = Item::declare();
        let properties: Vec<&str> = declaration
            .readable_properties()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(properties, vec!["name", "id"]);
    }

    #[test]
    fn test_projected_supertype_accessor() {
        let declaration = TypeKey::of::<Item>().declaration();
        let parent = declaration.supertype.expect("supertype");
        let Slot::LinkList(accessor) = &parent.attributes[0].slot else {
            panic!("expected a link list slot");
        };

        let mut item = Item::default();
        let link = Link::new("next", "/items?page=2").unwrap();
        accessor.set(&mut item, vec![link.clone()]).unwrap();
        assert_eq!(item.base.links, vec![link]);
    }

    #[test]
    fn test_wrong_instance_type() {
        let accessor = FieldAccessor::new("self_link", |i: &mut Item| &mut i.self_link);
        let mut base = Base::default();
        let err = accessor.set(&mut base, None).unwrap_err();
        assert_eq!(err.attribute(), Some("self_link"));
        assert_eq!(err.owner(), "Item");
    }

    #[test]
    fn test_embedded_list_visits_each() {
        let declaration = TypeKey::of::<Item>().declaration();
        let Slot::Container(children) = &declaration.attributes[1].slot else {
            panic!("expected a container slot");
        };

        let mut item = Item::default();
        let mut visited = 0;
        children
            .for_each(&mut item, &mut |_: &mut dyn DynResource| -> LinkResult<()> {
                visited += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(visited, 0);

        item.children = Some(Embedded::new(
            "items",
            vec![Item::default(), Item::default()],
        ));
        children
            .for_each(&mut item, &mut |child: &mut dyn DynResource| -> LinkResult<()> {
                assert_eq!(child.type_key(), TypeKey::of::<Item>());
                visited += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_snapshot_flattens_supertype() {
        let item = Item {
            base: Base { id: 7, links: Vec::new() },
            name: "pen".into(),
            ..Item::default()
        };
        assert_eq!(
            item.snapshot().unwrap(),
            serde_json::json!({ "id": 7, "name": "pen" })
        );
    }

    #[test]
    fn test_spec_kinds() {
        let attribute = Attribute::<Item>::other("name", "String").with(LinkRel::self_link("/x"));
        assert_eq!(attribute.kind(), AttributeKind::Other("String"));
        assert_eq!(
            attribute.spec().map(LinkSpec::expected_kind),
            Some(AttributeKind::Link)
        );
        assert_eq!(AttributeKind::LinkList.to_string(), "Vec<Link>");
    }
}
