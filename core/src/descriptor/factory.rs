//! Compiles declarations into descriptors.

use super::{CurieDescriptor, CurieDescriptors, HrefTemplate, LinkDescriptor};
use crate::context::{instance_expression, uri_expression};
use crate::declare::{BindingOption, CurieDef, CurieDefs, CurieType, LinkRel, LinkRelType, LinkRels};
use crate::error::{LinkError, LinkResult};
use crate::link::rels;
use crate::routes::LinkTemplateFactory;
use crate::template::extract_parameter_names;
use heck::ToLowerCamelCase;
use indexmap::IndexSet;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The type a declaration is attached to: its name and readable properties.
#[derive(Debug, Clone, Copy)]
pub struct DeclaringType<'a> {
    /// Type name, used in error messages.
    pub name: &'a str,
    /// Property names readable through `${instance.<name>}`.
    pub properties: &'a IndexSet<String>,
}

impl DeclaringType<'_> {
    fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }
}

/// Compiles [`LinkRel`] and [`CurieDef`] declarations.
#[derive(Clone)]
pub struct LinkDescriptorFactory {
    link_template_factory: Arc<dyn LinkTemplateFactory>,
}

impl std::fmt::Debug for LinkDescriptorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkDescriptorFactory").finish_non_exhaustive()
    }
}

impl LinkDescriptorFactory {
    /// Creates a factory using `link_template_factory` for raw templates.
    pub fn new(link_template_factory: Arc<dyn LinkTemplateFactory>) -> Self {
        LinkDescriptorFactory {
            link_template_factory,
        }
    }

    /// Compiles one link declaration.
    pub fn create_link_descriptor(
        &self,
        declaring: DeclaringType<'_>,
        link_rel: &LinkRel,
    ) -> LinkResult<LinkDescriptor> {
        let link_rel = LinkRelType::value_of(link_rel)?;
        let template = self.link_template_factory.create_link_template(&link_rel)?;

        let bindings = apply_binding_options(declaring, &template, &link_rel);
        let remove_unexpanded = !link_rel
            .binding_options()
            .contains(&BindingOption::RetainUnexpanded);
        let href = HrefTemplate::with_bindings(template, link_rel.style(), bindings, remove_unexpanded);

        Ok(LinkDescriptor {
            rel: link_rel.rel().to_string(),
            href,
            media_type: link_rel.media_type().map(str::to_string),
            deprecation: link_rel.deprecation().map(str::to_string),
            name: link_rel.name().map(str::to_string),
            profile: link_rel.profile().map(str::to_string),
            title: link_rel.title().map(str::to_string),
            hreflang: link_rel.hreflang().map(str::to_string),
            condition: link_rel.condition().map(str::to_string),
            curie: link_rel.curie().map(str::to_string),
        })
    }

    /// Compiles a group of link declarations, in order.
    ///
    /// A `self` rel is only allowed as the first entry.
    pub fn create_link_descriptors(
        &self,
        declaring: DeclaringType<'_>,
        link_rels: &LinkRels,
    ) -> LinkResult<Vec<LinkDescriptor>> {
        let mut descriptors = Vec::with_capacity(link_rels.0.len());
        for (idx, link_rel) in link_rels.0.iter().enumerate() {
            if idx > 0 && link_rel.rel() == rels::SELF {
                return Err(LinkError::RelOrder {
                    owner: declaring.name.to_string(),
                });
            }
            descriptors.push(self.create_link_descriptor(declaring, link_rel)?);
        }
        Ok(descriptors)
    }

    /// Compiles one curie declaration.
    pub fn create_curie_descriptor(&self, curie_def: &CurieDef) -> LinkResult<CurieDescriptor> {
        let curie = CurieType::value_of(curie_def)?;
        Ok(CurieDescriptor::new(
            curie.name(),
            HrefTemplate::new(curie.value(), curie.style()),
        ))
    }

    /// Compiles a group of curie declarations, in order.
    pub fn create_curie_descriptor_list(
        &self,
        curie_defs: &CurieDefs,
    ) -> LinkResult<Vec<CurieDescriptor>> {
        curie_defs
            .0
            .iter()
            .map(|def| self.create_curie_descriptor(def))
            .collect()
    }

    /// Builds a registry from curie declarations given in hierarchy order,
    /// supertypes first. Later declarations of a name replace earlier ones.
    pub fn create_curie_descriptors<'d>(
        &self,
        curie_defs: impl IntoIterator<Item = &'d CurieDef>,
    ) -> LinkResult<CurieDescriptors> {
        curie_defs
            .into_iter()
            .map(|def| self.create_curie_descriptor(def))
            .collect::<LinkResult<Vec<_>>>()
            .map(|descriptors| descriptors.into_iter().collect())
    }
}

/// Adds the implicit bindings requested by the binding options.
fn apply_binding_options(
    declaring: DeclaringType<'_>,
    template: &str,
    link_rel: &LinkRelType,
) -> BTreeMap<String, String> {
    let options = link_rel.binding_options();
    let mut bindings: BTreeMap<String, String> = link_rel
        .bindings()
        .iter()
        .map(|(name, expr)| (name.clone(), expr.clone()))
        .collect();

    let instance = options.contains(&BindingOption::InstanceParameters);
    let snake_case = options.contains(&BindingOption::InstanceParametersSnakeCase);
    let uri = options.contains(&BindingOption::UriParameters);
    if !instance && !snake_case && !uri {
        return bindings;
    }

    let parameter_names = extract_parameter_names(template);

    if instance || snake_case {
        for name in &parameter_names {
            if bindings.contains_key(name) {
                continue;
            }
            let property = if snake_case {
                name.to_lower_camel_case()
            } else {
                name.clone()
            };
            if declaring.has_property(&property) {
                bindings.insert(name.clone(), instance_expression(&property));
            }
        }
    }

    if uri {
        for name in parameter_names {
            if !bindings.contains_key(&name) {
                let expression = uri_expression(&name);
                bindings.insert(name, expression);
            }
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::LiteralLinkTemplateFactory;

    fn factory() -> LinkDescriptorFactory {
        LinkDescriptorFactory::new(Arc::new(LiteralLinkTemplateFactory))
    }

    fn properties(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn bindings_of(descriptor: &LinkDescriptor) -> Vec<(&str, &str)> {
        descriptor
            .href()
            .bindings()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_explicit_bindings_only() {
        let props = properties(&["id"]);
        let declaring = DeclaringType { name: "Order", properties: &props };
        let descriptor = factory()
            .create_link_descriptor(
                declaring,
                &LinkRel::self_link("/orders/{id}").binding("id", "${instance.id}"),
            )
            .unwrap();
        assert_eq!(bindings_of(&descriptor), vec![("id", "${instance.id}")]);
        assert!(descriptor.href().remove_unexpanded());
    }

    #[test]
    fn test_instance_then_uri_parameters() {
        let props = properties(&["id"]);
        let declaring = DeclaringType { name: "Order", properties: &props };
        let descriptor = factory()
            .create_link_descriptor(
                declaring,
                &LinkRel::self_link("/orders/{id}{?page}")
                    .binding_option(BindingOption::InstanceParameters)
                    .binding_option(BindingOption::UriParameters),
            )
            .unwrap();
        assert_eq!(
            bindings_of(&descriptor),
            vec![("id", "${instance.id}"), ("page", "${uri.page}")]
        );
    }

    #[test]
    fn test_snake_case_parameters() {
        let props = properties(&["customerId"]);
        let declaring = DeclaringType { name: "Order", properties: &props };
        let descriptor = factory()
            .create_link_descriptor(
                declaring,
                &LinkRel::new("customer")
                    .value("/customers/{customer_id}")
                    .binding_option(BindingOption::InstanceParametersSnakeCase),
            )
            .unwrap();
        assert_eq!(
            bindings_of(&descriptor),
            vec![("customer_id", "${instance.customerId}")]
        );
    }

    #[test]
    fn test_retain_unexpanded() {
        let props = properties(&[]);
        let declaring = DeclaringType { name: "Order", properties: &props };
        let descriptor = factory()
            .create_link_descriptor(
                declaring,
                &LinkRel::new("search")
                    .value("/orders{?q}")
                    .binding_option(BindingOption::RetainUnexpanded),
            )
            .unwrap();
        assert!(!descriptor.href().remove_unexpanded());
    }

    #[test]
    fn test_self_must_be_first() {
        let props = properties(&[]);
        let declaring = DeclaringType { name: "Order", properties: &props };
        let group = LinkRels(vec![
            LinkRel::new("next").value("/orders?page=2"),
            LinkRel::self_link("/orders"),
        ]);
        assert!(matches!(
            factory().create_link_descriptors(declaring, &group),
            Err(LinkError::RelOrder { owner }) if owner == "Order"
        ));

        let group = LinkRels(vec![
            LinkRel::self_link("/orders"),
            LinkRel::new("next").value("/orders?page=2"),
        ]);
        let descriptors = factory().create_link_descriptors(declaring, &group).unwrap();
        assert_eq!(descriptors.len(), 2);
    }

    #[test]
    fn test_curie_registry_last_wins() {
        let defs = [
            CurieDef::new("docs", "/base/docs/{rel}"),
            CurieDef::new("ext", "/ext/{rel}"),
            CurieDef::new("docs", "/sub/docs/{rel}"),
        ];
        let curies = factory().create_curie_descriptors(&defs).unwrap();
        assert_eq!(curies.len(), 2);
        assert_eq!(
            curies.get("docs").map(|c| c.href().value()),
            Some("/sub/docs/{rel}")
        );
    }

    #[test]
    fn test_curie_validation() {
        assert!(factory().create_curie_descriptor(&CurieDef::new(" ", "/docs/{rel}")).is_err());
        let list = factory()
            .create_curie_descriptor_list(&CurieDefs(vec![CurieDef::new("a", "/a/{rel}")]))
            .unwrap();
        assert_eq!(list[0].name(), "a");
    }
}
