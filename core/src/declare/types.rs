//! Validated forms of the declaration records.

use super::{BindingOption, CurieDef, LinkRel};
use crate::context::Style;
use crate::error::{LinkError, LinkResult};
use crate::link::{has_text, rels};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// A routed target: a resource, optionally narrowed to one of its methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    resource: String,
    method: Option<String>,
}

impl ResourceRef {
    /// Creates a reference.
    pub fn new(resource: impl Into<String>, method: Option<String>) -> Self {
        ResourceRef {
            resource: resource.into(),
            method,
        }
    }

    /// The resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The method name, if any.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
}

/// A validated [`LinkRel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelType {
    rel: String,
    href: Option<String>,
    media_type: Option<String>,
    deprecation: Option<String>,
    name: Option<String>,
    profile: Option<String>,
    title: Option<String>,
    hreflang: Option<String>,
    curie: Option<String>,
    resource: Option<ResourceRef>,
    condition: Option<String>,
    bindings: IndexMap<String, String>,
    style: Style,
    binding_options: BTreeSet<BindingOption>,
}

impl LinkRelType {
    /// Validates `link_rel`.
    ///
    /// Either a value or a resource must be given, but not both. Blank
    /// optional hints are treated as absent.
    pub fn value_of(link_rel: &LinkRel) -> LinkResult<Self> {
        has_text(&link_rel.rel, "LinkRel.rel")?;
        let resource = to_resource_ref(link_rel)?;
        let href = match resource {
            None => {
                has_text(&link_rel.value, "LinkRel.value")?;
                Some(link_rel.value.clone())
            }
            Some(_) if !link_rel.value.is_empty() => {
                return Err(LinkError::InvalidDeclaration(
                    "Cannot specify LinkRel.value and LinkRel.resource, they are mutually exclusive"
                        .to_string(),
                ))
            }
            Some(_) => None,
        };

        let mut bindings = IndexMap::with_capacity(link_rel.bindings.len());
        for binding in &link_rel.bindings {
            has_text(&binding.name, "Binding.name")?;
            has_text(&binding.value, "Binding.value")?;
            bindings.insert(binding.name.clone(), binding.value.clone());
        }

        let binding_options: BTreeSet<BindingOption> =
            link_rel.binding_options.iter().copied().collect();
        if binding_options.contains(&BindingOption::InstanceParameters)
            && binding_options.contains(&BindingOption::InstanceParametersSnakeCase)
        {
            return Err(LinkError::InvalidDeclaration(format!(
                "Cannot specify both LinkRel.binding_options {:?} and {:?}, they are mutually exclusive",
                BindingOption::InstanceParameters,
                BindingOption::InstanceParametersSnakeCase
            )));
        }

        Ok(LinkRelType {
            rel: link_rel.rel.clone(),
            href,
            media_type: none_if_blank(&link_rel.media_type),
            deprecation: none_if_blank(&link_rel.deprecation),
            name: none_if_blank(&link_rel.name),
            profile: none_if_blank(&link_rel.profile),
            title: none_if_blank(&link_rel.title),
            hreflang: none_if_blank(&link_rel.hreflang),
            curie: rels::curie_prefix(&link_rel.rel).map(str::to_string),
            resource,
            condition: none_if_blank(&link_rel.condition),
            bindings,
            style: link_rel.style,
            binding_options,
        })
    }

    /// The rel.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The literal href or template, absent when a resource is targeted.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Media type hint.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Deprecation hint.
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecation.as_deref()
    }

    /// Link name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Profile hint.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Target language.
    pub fn hreflang(&self) -> Option<&str> {
        self.hreflang.as_deref()
    }

    /// The curie prefix of the rel, if any.
    pub fn curie(&self) -> Option<&str> {
        self.curie.as_deref()
    }

    /// The routed target, absent when a literal href is given.
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    /// The condition expression.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Explicit bindings, variable name to expression.
    pub fn bindings(&self) -> &IndexMap<String, String> {
        &self.bindings
    }

    /// The href style.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Enabled binding options.
    pub fn binding_options(&self) -> &BTreeSet<BindingOption> {
        &self.binding_options
    }
}

fn to_resource_ref(link_rel: &LinkRel) -> LinkResult<Option<ResourceRef>> {
    let method = link_rel.method.as_deref().and_then(none_if_blank);
    match link_rel.resource.as_deref() {
        Some(resource) => {
            has_text(resource, "LinkRel.resource")?;
            Ok(Some(ResourceRef::new(resource, method)))
        }
        None if method.is_some() => Err(LinkError::InvalidDeclaration(
            "Cannot specify LinkRel.method without also specifying LinkRel.resource".to_string(),
        )),
        None => Ok(None),
    }
}

fn none_if_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

const REL_PLACEHOLDER: &str = "{rel}";

/// A validated [`CurieDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurieType {
    name: String,
    value: String,
    style: Style,
}

impl CurieType {
    /// Validates `curie_def`.
    pub fn value_of(curie_def: &CurieDef) -> LinkResult<Self> {
        has_text(&curie_def.name, "CurieDef.name")?;
        has_text(&curie_def.value, "CurieDef.value")?;
        if !curie_def.value.ends_with(REL_PLACEHOLDER) {
            return Err(LinkError::InvalidDeclaration(format!(
                "CurieDef.value must end with {}, got: {}",
                REL_PLACEHOLDER, curie_def.value
            )));
        }
        Ok(CurieType {
            name: curie_def.name.clone(),
            value: curie_def.value.clone(),
            style: curie_def.style,
        })
    }

    /// The curie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The documentation template.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The href style.
    pub fn style(&self) -> Style {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_and_resource_exclusive() {
        let rel = LinkRel::new("orders").value("/orders").resource("orders");
        assert!(matches!(
            LinkRelType::value_of(&rel),
            Err(LinkError::InvalidDeclaration(msg)) if msg.contains("mutually exclusive")
        ));
    }

    #[test]
    fn test_value_or_resource_required() {
        assert!(LinkRelType::value_of(&LinkRel::new("orders")).is_err());
        let routed = LinkRelType::value_of(&LinkRel::new("orders").resource("orders")).unwrap();
        assert_eq!(routed.href(), None);
        assert_eq!(routed.resource().map(ResourceRef::resource), Some("orders"));
    }

    #[test]
    fn test_method_requires_resource() {
        let rel = LinkRel::new("orders").value("/orders").method("list");
        assert!(matches!(
            LinkRelType::value_of(&rel),
            Err(LinkError::InvalidDeclaration(msg)) if msg.contains("method")
        ));
    }

    #[test]
    fn test_blank_binding_rejected() {
        let rel = LinkRel::new("orders").value("/orders/{id}").binding(" ", "${x}");
        assert!(LinkRelType::value_of(&rel).is_err());
    }

    #[test]
    fn test_instance_options_exclusive() {
        let rel = LinkRel::new("orders")
            .value("/orders/{id}")
            .binding_option(BindingOption::InstanceParameters)
            .binding_option(BindingOption::InstanceParametersSnakeCase);
        assert!(LinkRelType::value_of(&rel).is_err());
    }

    #[test]
    fn test_blank_hints_absent_and_curie_derived() {
        let rel = LinkRel::new("docs:orders")
            .value("/orders")
            .title("")
            .name("  ")
            .condition("");
        let ty = LinkRelType::value_of(&rel).unwrap();
        assert_eq!(ty.title(), None);
        assert_eq!(ty.name(), None);
        assert_eq!(ty.condition(), None);
        assert_eq!(ty.curie(), Some("docs"));
    }

    #[test]
    fn test_curie_type() {
        let ty = CurieType::value_of(&CurieDef::new("docs", "/docs/{rel}")).unwrap();
        assert_eq!(ty.name(), "docs");
        assert_eq!(ty.style(), Style::AbsolutePath);
        assert!(CurieType::value_of(&CurieDef::new("docs", "")).is_err());
    }

    #[test]
    fn test_curie_value_must_end_with_rel() {
        assert!(matches!(
            CurieType::value_of(&CurieDef::new("docs", "/docs")),
            Err(LinkError::InvalidDeclaration(msg)) if msg.contains("{rel}")
        ));
        assert!(CurieType::value_of(&CurieDef::new("docs", "/docs/{rel}/index")).is_err());
        assert!(CurieType::value_of(&CurieDef::new("docs", "https://docs.example.com/{rel}")).is_ok());
    }
}
