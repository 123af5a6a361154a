//! [`Resolver`] – name-based class and member resolution.
//!
//! Member lookup attempts an exact parameter-signature match first and only
//! then falls back to matching by name and parameter count alone. The
//! fallback tolerates host API drift at the cost of ambiguity; when several
//! overloads share an arity the *first* one in hierarchy-then-declaration
//! order wins. That tie-break is deliberate and load-bearing: call sites
//! may depend on the specific overload it happens to select, so it is never
//! "improved" with type scoring.
//!
//! Candidate lists are computed once per (class, name, arity) and memoized,
//! so repeated lookups never re-walk the hierarchy and always return the
//! same member.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use waylay_types::CoreError;

use crate::model::{HostClass, HostMember, HostModel, MemberKind};

// Cache key for constructor candidate lists; host members never carry this
// name for methods.
const CTOR_NAME: &str = "<init>";

/// Resolves classes and members against one [`HostModel`].
pub struct Resolver {
    model: Arc<HostModel>,
    candidates: DashMap<(String, String, usize), Vec<Arc<HostMember>>>,
}

impl Resolver {
    pub fn new(model: Arc<HostModel>) -> Self {
        Self {
            model,
            candidates: DashMap::new(),
        }
    }

    pub fn model(&self) -> &Arc<HostModel> {
        &self.model
    }

    /// Look up a class by name in this model.
    pub fn resolve_class(&self, name: &str) -> Result<Arc<HostClass>, CoreError> {
        self.model
            .class(name)
            .ok_or_else(|| CoreError::ClassNotFound(name.to_string()))
    }

    /// [`Resolver::resolve_class`], reporting absence instead of failing.
    pub fn resolve_class_if_exists(&self, name: &str) -> Option<Arc<HostClass>> {
        let found = self.model.class(name);
        if found.is_none() {
            debug!(class = name, "class not present in host model");
        }
        found
    }

    /// Resolve a method on `class` (or its superclasses).
    ///
    /// Exact-signature match first, over the whole hierarchy walk; then the
    /// name + arity fallback over the same walk. Fails with
    /// [`CoreError::MemberNotFound`] only when no overload of that name and
    /// arity exists anywhere in the chain.
    pub fn resolve_method(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
    ) -> Result<Arc<HostMember>, CoreError> {
        let candidates = self.method_candidates(class, name, param_types.len())?;
        let exact = candidates
            .iter()
            .find(|m| m.param_types().iter().map(String::as_str).eq(param_types.iter().copied()));
        match exact.or_else(|| candidates.first()) {
            Some(member) => Ok(Arc::clone(member)),
            None => Err(CoreError::MemberNotFound {
                class: class.to_string(),
                member: name.to_string(),
                arity: param_types.len(),
            }),
        }
    }

    /// [`Resolver::resolve_method`], reporting absence instead of failing.
    pub fn resolve_method_if_exists(
        &self,
        class: &str,
        name: &str,
        param_types: &[&str],
    ) -> Option<Arc<HostMember>> {
        match self.resolve_method(class, name, param_types) {
            Ok(member) => Some(member),
            Err(error) => {
                debug!(class, member = name, %error, "method not resolvable");
                None
            }
        }
    }

    /// Resolve a constructor on the declaring class only; constructors are
    /// not inherited, so the hierarchy walk does not apply.
    pub fn resolve_constructor(
        &self,
        class: &str,
        param_types: &[&str],
    ) -> Result<Arc<HostMember>, CoreError> {
        let key = (class.to_string(), CTOR_NAME.to_string(), param_types.len());
        if !self.candidates.contains_key(&key) {
            let declaring = self.resolve_class(class)?;
            let found: Vec<Arc<HostMember>> = declaring
                .declared_constructors()
                .into_iter()
                .filter(|c| c.arity() == param_types.len())
                .collect();
            self.candidates.insert(key.clone(), found);
        }
        let candidates = self
            .candidates
            .get(&key)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        let exact = candidates
            .iter()
            .find(|c| c.param_types().iter().map(String::as_str).eq(param_types.iter().copied()));
        match exact.or_else(|| candidates.first()) {
            Some(ctor) => Ok(Arc::clone(ctor)),
            None => Err(CoreError::MemberNotFound {
                class: class.to_string(),
                member: CTOR_NAME.to_string(),
                arity: param_types.len(),
            }),
        }
    }

    /// [`Resolver::resolve_constructor`], reporting absence instead of failing.
    pub fn resolve_constructor_if_exists(
        &self,
        class: &str,
        param_types: &[&str],
    ) -> Option<Arc<HostMember>> {
        match self.resolve_constructor(class, param_types) {
            Ok(ctor) => Some(ctor),
            Err(error) => {
                debug!(class, %error, "constructor not resolvable");
                None
            }
        }
    }

    // Candidate list for (class, name, arity): every same-name same-arity
    // method from the declaring class up the superclass chain, in
    // hierarchy-then-declaration order. Computed once, then served from the
    // cache.
    fn method_candidates(
        &self,
        class: &str,
        name: &str,
        arity: usize,
    ) -> Result<Vec<Arc<HostMember>>, CoreError> {
        let key = (class.to_string(), name.to_string(), arity);
        if let Some(cached) = self.candidates.get(&key) {
            return Ok(cached.clone());
        }

        // The walk itself validates that the starting class exists.
        let mut current = Some(self.resolve_class(class)?);
        let mut visited: HashSet<String> = HashSet::new();
        let mut found = Vec::new();
        while let Some(c) = current {
            if !visited.insert(c.name().to_string()) {
                // Superclass cycle in a malformed model; stop the walk.
                break;
            }
            for member in c.members() {
                if member.kind() == MemberKind::Method
                    && member.name() == name
                    && member.arity() == arity
                {
                    found.push(Arc::clone(member));
                }
            }
            current = c.superclass().and_then(|s| self.model.class(s));
        }

        self.candidates.insert(key, found.clone());
        Ok(found)
    }
}
