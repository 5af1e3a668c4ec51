//! Options that steer a declarative apply.

/// Restrictions on what an apply may do to the live resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleParam {
    /// Fail instead of creating a missing resource
    BlockCreation,
    /// Fail if the resource already exists
    BlockAcquire,
    /// Fail instead of updating an existing resource
    BlockModification,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOption<R> {
    Lifecycle(LifecycleParam),
    /// A previously observed state, used to look up the live resource
    StateHint(R),
}

pub fn fetch_lifecycle_params<R>(opts: &[ApplyOption<R>]) -> Vec<LifecycleParam> {
    opts.iter()
        .filter_map(|opt| match opt {
            ApplyOption::Lifecycle(param) => Some(*param),
            ApplyOption::StateHint(_) => None,
        })
        .collect()
}

pub fn has_lifecycle_param(params: &[LifecycleParam], param: LifecycleParam) -> bool {
    params.contains(&param)
}

/// The last state hint among `opts`.
pub fn fetch_state_hint<R>(opts: &[ApplyOption<R>]) -> Option<&R> {
    opts.iter().rev().find_map(|opt| match opt {
        ApplyOption::StateHint(hint) => Some(hint),
        ApplyOption::Lifecycle(_) => None,
    })
}
