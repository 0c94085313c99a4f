//! Tag Resolver

use contracts::{domains, EntityKind, EntityRef};

/// Cache tags for a changed entity
///
/// Content and terms without a bundle/vocabulary get no bundle tag.
/// Unknown kinds yield no tags.
pub fn tags_for_entity(kind: &EntityKind, bundle: Option<&str>, id: &str) -> Vec<String> {
    let bundle = bundle.map(str::trim).filter(|b| !b.is_empty());
    match kind {
        EntityKind::Content => grouped(domains::CONTENT, bundle, format!("node:{id}")),
        EntityKind::TaxonomyTerm => grouped(domains::TAXONOMY, bundle, format!("term:{id}")),
        EntityKind::Menu => vec![domains::MENU.to_string(), format!("menu:{id}")],
        EntityKind::Other(_) => Vec::new(),
    }
}

/// Cache tags for an [`EntityRef`]
pub fn tags_for(entity: &EntityRef) -> Vec<String> {
    tags_for_entity(&entity.kind, entity.bundle.as_deref(), &entity.id)
}

fn grouped(domain: &str, bundle: Option<&str>, item: String) -> Vec<String> {
    let mut tags = Vec::with_capacity(3);
    tags.push(domain.to_string());
    if let Some(bundle) = bundle {
        tags.push(format!("{domain}:{bundle}"));
    }
    tags.push(item);
    tags
}
