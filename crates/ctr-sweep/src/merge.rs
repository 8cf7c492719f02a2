use crate::binder::{Assignment, ParameterSet};
use crate::parameter::Vars;

/// Merges run variables; later layers overwrite earlier keys wholesale.
///
/// Layers, in order: `global`, `playbook`, then for each binding of
/// `assignment` in cost-descending order the bound value followed by that
/// parameter's pegged variables. A lower cost parameter therefore shadows a
/// higher cost one on name collisions. Unbound entries are skipped.
pub fn merge_vars(
    global: &Vars,
    playbook: &Vars,
    assignment: &Assignment,
    parameters: &ParameterSet,
) -> Vars {
    let mut vars = global.clone();
    vars.extend(playbook.iter().map(|(k, v)| (k.clone(), v.clone())));
    for binding in assignment.bindings() {
        let Some(value) = binding.value.as_ref() else {
            continue;
        };
        vars.insert(binding.name.clone(), value.clone());
        if let Some(param) = parameters.get(&binding.name) {
            vars.extend(param.pegged_for(value));
        }
    }
    vars
}
