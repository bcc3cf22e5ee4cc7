//! Resolution plans: how to obtain an instance for a slot.
//!
//! A [Plan] is built once per requested slot by the [PlanBuilder], which selects a resolvable
//! constructor for each implementation in the dependency tree, and is then executed on every
//! resolution. Plans are immutable: singleton instances are memoised in the instance store,
//! not in the plan itself.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::describe::{Cast, ConstructorInfo, Instance, Invoke};
use crate::error::{ConstructError, ResolveError};
use crate::key::{SlotMap, TypeKey};
use crate::registry::{Implementation, Lifetime};

/// Reason why no plan could be built
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlanError {
    TypeNotRegistered,
    NoPublicConstructor,
    NoResolvableConstructor,
    CyclicDependency,
}

pub(crate) enum Plan {
    Error {
        kind: PlanError,
        key: TypeKey,
        name: Option<String>,
    },
    Instance(Instance),
    Build(BuildStep),
    SingletonBuild(BuildStep),
}

/// Call a constructor on the results of the parameter plans
pub(crate) struct BuildStep {
    key: TypeKey,
    name: Option<String>,
    implementation: TypeKey,
    invoke: Arc<Invoke>,
    cast: Arc<Cast>,
    parameters: Vec<Plan>,
}

impl Plan {
    fn error(kind: PlanError, key: TypeKey, name: Option<&str>) -> Self {
        Plan::Error {
            kind,
            key,
            name: name.map(str::to_owned),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Plan::Error { .. })
    }

    /// Obtain an instance, constructing it if needed
    ///
    /// Singleton steps look up and fill the instance store.
    pub fn execute(&self, instances: &mut SlotMap<Instance>) -> Result<Instance, ResolveError> {
        match self {
            Plan::Error { kind, key, name } => Err(kind.to_error(*key, name.clone())),
            Plan::Instance(instance) => Ok(Arc::clone(instance)),
            Plan::Build(step) => step.build(instances),
            Plan::SingletonBuild(step) => {
                if let Some(instance) = instances.get(step.key, step.name.as_deref()) {
                    return Ok(Arc::clone(instance));
                }
                let instance = step.build(instances)?;
                trace!(
                    interface = step.key.name(),
                    name = ?step.name,
                    "storing singleton instance"
                );
                instances.insert(step.key, step.name.as_deref(), Arc::clone(&instance));
                Ok(instance)
            }
        }
    }
}

impl PlanError {
    pub fn to_error(self, key: TypeKey, name: Option<String>) -> ResolveError {
        let interface = key.name();
        match self {
            PlanError::TypeNotRegistered => ResolveError::TypeNotRegistered { interface, name },
            PlanError::NoPublicConstructor => ResolveError::NoPublicConstructor { interface, name },
            PlanError::NoResolvableConstructor => {
                ResolveError::NoResolvableConstructor { interface, name }
            }
            PlanError::CyclicDependency => ResolveError::CyclicDependency { interface, name },
        }
    }
}

impl BuildStep {
    fn build(&self, instances: &mut SlotMap<Instance>) -> Result<Instance, ResolveError> {
        let mut arguments = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            arguments.push(parameter.execute(instances)?);
        }

        let concrete = (self.invoke)(&arguments).map_err(|e| match e {
            ConstructError::Failed(source) => ResolveError::Construction {
                interface: self.key.name(),
                implementation: self.implementation.name(),
                source,
            },
            ConstructError::ArgumentMismatch { expected } => {
                ResolveError::TypeMismatch { interface: expected }
            }
        })?;
        (self.cast)(&concrete).ok_or(ResolveError::TypeMismatch {
            interface: self.key.name(),
        })
    }
}

/// Why a constructor candidate was abandoned
enum Rejection {
    Cycle,
    Unresolvable,
}

/// Select constructors recursively, reading the implementation and instance stores
pub(crate) struct PlanBuilder<'a> {
    implementations: &'a SlotMap<Implementation>,
    instances: &'a SlotMap<Instance>,
    discovered: HashSet<TypeKey>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        implementations: &'a SlotMap<Implementation>,
        instances: &'a SlotMap<Instance>,
    ) -> Self {
        Self {
            implementations,
            instances,
            discovered: HashSet::new(),
        }
    }

    pub fn build(mut self, key: TypeKey, name: Option<&str>) -> Plan {
        self.discovered.insert(key);
        self.plan_for(key, name)
    }

    fn plan_for(&mut self, key: TypeKey, name: Option<&str>) -> Plan {
        if let Some(instance) = self.instances.get(key, name) {
            trace!(interface = key.name(), name = ?name, "instance found");
            return Plan::Instance(Arc::clone(instance));
        }

        let implementations = self.implementations;
        let Some(implementation) = implementations.get(key, name) else {
            trace!(interface = key.name(), name = ?name, "no registration found");
            return Plan::error(PlanError::TypeNotRegistered, key, name);
        };

        let candidates: Vec<&ConstructorInfo> = implementation
            .info
            .constructors()
            .iter()
            .filter(|constructor| constructor.is_public())
            .collect();
        if candidates.is_empty() {
            trace!(interface = key.name(), "no public constructor");
            return Plan::error(PlanError::NoPublicConstructor, key, name);
        }

        let mut cyclic = false;

        for constructor in candidates.iter().filter(|c| c.is_preferred()) {
            match self.resolve_parameters(constructor, name) {
                Ok(parameters) => return step(implementation, constructor, parameters, key, name),
                Err(Rejection::Cycle) => cyclic = true,
                Err(Rejection::Unresolvable) => {}
            }
        }

        if let Some(constructor) = candidates.iter().find(|c| c.parameters().is_empty()) {
            return step(implementation, constructor, Vec::new(), key, name);
        }

        for constructor in candidates.iter().filter(|c| !c.is_preferred()) {
            match self.resolve_parameters(constructor, name) {
                Ok(parameters) => return step(implementation, constructor, parameters, key, name),
                Err(Rejection::Cycle) => cyclic = true,
                Err(Rejection::Unresolvable) => {}
            }
        }

        if cyclic {
            trace!(interface = key.name(), "rejected constructors depend on a cycle");
            Plan::error(PlanError::CyclicDependency, key, name)
        } else {
            trace!(interface = key.name(), "no resolvable constructor");
            Plan::error(PlanError::NoResolvableConstructor, key, name)
        }
    }

    /// Plan every parameter of a constructor, with the same name as the parent slot
    fn resolve_parameters(
        &mut self,
        constructor: &ConstructorInfo,
        name: Option<&str>,
    ) -> Result<Vec<Plan>, Rejection> {
        let mut plans = Vec::with_capacity(constructor.parameters().len());
        for &parameter in constructor.parameters() {
            if !self.discovered.insert(parameter) {
                trace!(parameter = parameter.name(), "cyclic dependency");
                return Err(Rejection::Cycle);
            }
            let plan = self.plan_for(parameter, name);
            self.discovered.remove(&parameter);

            match plan {
                Plan::Error {
                    kind: PlanError::CyclicDependency,
                    ..
                } => return Err(Rejection::Cycle),
                Plan::Error { .. } => {
                    trace!(parameter = parameter.name(), "unresolvable parameter");
                    return Err(Rejection::Unresolvable);
                }
                plan => plans.push(plan),
            }
        }
        Ok(plans)
    }
}

fn step(
    implementation: &Implementation,
    constructor: &ConstructorInfo,
    parameters: Vec<Plan>,
    key: TypeKey,
    name: Option<&str>,
) -> Plan {
    trace!(
        interface = key.name(),
        implementation = implementation.info.key().name(),
        parameters = parameters.len(),
        "constructor selected"
    );
    let step = BuildStep {
        key,
        name: name.map(str::to_owned),
        implementation: implementation.info.key(),
        invoke: Arc::clone(constructor.invoker()),
        cast: Arc::clone(&implementation.cast),
        parameters,
    };
    match implementation.lifetime {
        Lifetime::Transient => Plan::Build(step),
        Lifetime::Singleton => Plan::SingletonBuild(step),
    }
}
