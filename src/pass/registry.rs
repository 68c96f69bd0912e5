// Copyright (c) 2017-2021 Fabian Schuiki

//! Lookup of passes by name and assembly of the default pipeline.

use crate::{
    ir::Module,
    pass::{DeadCodeElim, Pass, PassContext},
};

/// Points in the default pipeline at which passes may ask to be inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionPoint {
    /// Before any other pass in the pipeline.
    EarlyAsPossible,
    /// After all other passes in the pipeline.
    OptimizerLast,
}

/// A pass as known to the registry.
#[derive(Clone, Copy)]
pub struct PassInfo {
    /// The name under which the pass can be requested.
    pub name: &'static str,
    /// A one-line description of the pass.
    pub description: &'static str,
    run: fn(&PassContext, &mut Module) -> bool,
}

impl PassInfo {
    /// Describe a pass.
    pub fn new<P: Pass>(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            run: P::run_on_module,
        }
    }

    /// Run the pass on a module.
    pub fn run(&self, ctx: &PassContext, module: &mut Module) -> bool {
        (self.run)(ctx, module)
    }
}

impl std::fmt::Debug for PassInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A registry of passes.
///
/// Passes are registered under a unique name. Additionally, a pass may ask to
/// be run automatically as part of the default pipeline by registering at an
/// `ExtensionPoint`.
#[derive(Debug, Default)]
pub struct PassRegistry {
    passes: Vec<PassInfo>,
    extensions: Vec<(ExtensionPoint, &'static str)>,
}

impl PassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a registry with all passes of this crate.
    pub fn with_builtin_passes() -> Self {
        let mut registry = Self::new();
        registry.register(PassInfo::new::<DeadCodeElim>(
            DeadCodeElim::NAME,
            DeadCodeElim::DESCRIPTION,
        ));
        registry.register_standard(ExtensionPoint::EarlyAsPossible, DeadCodeElim::NAME);
        registry
    }

    /// Register a pass such that it can be requested by name.
    ///
    /// A pass registered under an already existing name replaces it.
    pub fn register(&mut self, info: PassInfo) {
        trace!("Registering pass `{}`", info.name);
        match self.passes.iter_mut().find(|p| p.name == info.name) {
            Some(existing) => *existing = info,
            None => self.passes.push(info),
        }
    }

    /// Ask for a registered pass to run as part of the default pipeline.
    pub fn register_standard(&mut self, point: ExtensionPoint, name: &'static str) {
        trace!("Adding pass `{}` at {:?}", name, point);
        self.extensions.push((point, name));
    }

    /// Find a pass by name.
    pub fn get(&self, name: &str) -> Option<&PassInfo> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Return an iterator over all registered passes.
    pub fn passes(&self) -> impl Iterator<Item = &PassInfo> {
        self.passes.iter()
    }

    /// Assemble the default pipeline.
    ///
    /// Passes are ordered by extension point, and by registration order within
    /// one extension point. Names that do not refer to a registered pass are
    /// skipped.
    pub fn default_pipeline(&self) -> Vec<&PassInfo> {
        let mut extensions = self.extensions.clone();
        extensions.sort_by_key(|&(point, _)| point);
        extensions
            .into_iter()
            .filter_map(|(point, name)| {
                let info = self.get(name);
                if info.is_none() {
                    warn!("Pass `{}` requested at {:?} is not registered", name, point);
                }
                info
            })
            .collect()
    }
}
