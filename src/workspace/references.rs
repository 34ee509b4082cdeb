use super::semantic::{Symbol, is_declaration_name};
use super::symbols::{TypeIdentity, TypeRef};
use super::syntax::{Location, descendants, node_text};
use super::{Document, Solution};
use crate::cancel::CancellationToken;
use crate::error::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// All references to one definition.
#[derive(Debug, Clone)]
pub struct ReferencedSymbol {
    pub definition: TypeIdentity,
    pub locations: Vec<Location>,
}

impl Solution {
    /// Find every name across the solution that binds to a type called like `target`.
    ///
    /// Candidates are filtered by simple name, then bound in their own project. Each distinct
    /// definition gets its own group; the group for `target` itself comes first.
    pub fn find_references(
        &self,
        target: &TypeIdentity,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReferencedSymbol>> {
        cancel.check()?;
        let name = target.name().to_string();
        let per_document: Vec<Vec<(TypeIdentity, Location)>> = self
            .documents()
            .par_iter()
            .filter(|document| document.text().contains(name.as_str()))
            .map(|document| self.references_in(document, &name, cancel))
            .collect::<Result<_>>()?;

        let mut groups: BTreeMap<TypeIdentity, Vec<Location>> = BTreeMap::new();
        for (definition, location) in per_document.into_iter().flatten() {
            groups.entry(definition).or_default().push(location);
        }
        let mut out: Vec<ReferencedSymbol> = groups
            .into_iter()
            .map(|(definition, mut locations)| {
                locations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
                locations.dedup();
                ReferencedSymbol {
                    definition,
                    locations,
                }
            })
            .collect();
        out.sort_by_key(|group| &group.definition != target);
        tracing::debug!(
            target = %target,
            groups = out.len(),
            "reference search finished"
        );
        Ok(out)
    }

    fn references_in(
        &self,
        document: &Arc<Document>,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<(TypeIdentity, Location)>> {
        cancel.check()?;
        let model = self.semantic_model(document.id)?;
        let mut found = Vec::new();
        for node in descendants(model.root()) {
            if node.kind() != "identifier" || node_text(node, model.source()) != name {
                continue;
            }
            if is_declaration_name(node) {
                continue;
            }
            if let Some(Symbol::Type(TypeRef::Named(named))) = model.symbol_of(node) {
                found.push((named.identity, model.location(node)));
            }
        }
        Ok(found)
    }
}
