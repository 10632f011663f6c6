//! Deterministic rule registry for `ErrorType::ElementInvisible` (4.H). These
//! never call a model — each rule inspects the element's current class list
//! and either emits a [`ClassPatch`] or passes, same shape as the scene-graph
//! invisible-element diagnosis in the two-step vision repair prompt
//! (`validation/fixer.py::_build_invisible_elements_report`), but applied as
//! a direct CSS edit instead of a repair-prompt hint.

use crate::contracts::{ClassPatch, ClassifiedError, ErrorType};

const HIDING_CLASSES: [&str; 3] = ["hidden", "invisible", "opacity-0"];
const THREED_HIDING_PREFIXES: [&str; 3] = ["rotate-y-", "rotate-x-", "-rotate-y-"];

/// One rule in the registry: given the element's current Tailwind classes,
/// decide whether to emit class adds/removes.
struct Rule {
    name: &'static str,
    apply: fn(&[String]) -> Option<(Vec<String>, Vec<String>)>,
}

fn restore_visibility(classes: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let remove: Vec<String> = classes.iter().filter(|c| HIDING_CLASSES.contains(&c.as_str())).cloned().collect();
    if remove.is_empty() {
        None
    } else {
        Some((Vec::new(), remove))
    }
}

fn raise_obscured_z_index(classes: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let has_low_z = classes.iter().any(|c| c == "z-0" || c == "z-10" || c == "-z-10");
    let has_position = classes.iter().any(|c| c == "relative" || c == "absolute" || c == "fixed" || c == "sticky");
    if has_low_z && has_position {
        Some((vec!["z-50".to_string()], vec!["z-0".to_string(), "z-10".to_string(), "-z-10".to_string()]))
    } else {
        None
    }
}

fn add_pointer_events_auto(classes: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    if classes.iter().any(|c| c == "pointer-events-none") {
        Some((vec!["pointer-events-auto".to_string()], vec!["pointer-events-none".to_string()]))
    } else {
        None
    }
}

fn disable_hiding_3d_transforms(classes: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let remove: Vec<String> = classes
        .iter()
        .filter(|c| THREED_HIDING_PREFIXES.iter().any(|p| c.starts_with(p)))
        .cloned()
        .collect();
    if remove.is_empty() {
        None
    } else {
        Some((Vec::new(), remove))
    }
}

fn wrap_missing_stacking_context(classes: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let has_position = classes.iter().any(|c| c == "relative" || c == "absolute" || c == "fixed" || c == "sticky");
    let has_z = classes.iter().any(|c| c.starts_with("z-") || c.starts_with("-z-"));
    if has_z && !has_position {
        Some((vec!["relative".to_string(), "z-10".to_string()], Vec::new()))
    } else {
        None
    }
}

fn registry() -> &'static [Rule] {
    &[
        Rule { name: "restore_visibility", apply: restore_visibility },
        Rule { name: "raise_obscured_z_index", apply: raise_obscured_z_index },
        Rule { name: "add_pointer_events_auto", apply: add_pointer_events_auto },
        Rule { name: "disable_hiding_3d_transforms", apply: disable_hiding_3d_transforms },
        Rule { name: "wrap_missing_stacking_context", apply: wrap_missing_stacking_context },
    ]
}

/// Runs every applicable rule against `current_classes` and merges their
/// output into one patch. Returns `None` if `error` isn't `ElementInvisible`
/// or no rule matched.
pub fn run(error: &ClassifiedError, current_classes: &[String]) -> Option<ClassPatch> {
    if error.error_type != ErrorType::ElementInvisible {
        return None;
    }

    let mut patch = ClassPatch::new(error.selector.clone());
    let mut reasons = Vec::new();
    for rule in registry() {
        if let Some((add, remove)) = (rule.apply)(current_classes) {
            patch.add_classes.extend(add);
            patch.remove_classes.extend(remove);
            reasons.push(rule.name);
        }
    }

    if patch.add_classes.is_empty() && patch.remove_classes.is_empty() {
        return None;
    }
    patch.reason = Some(reasons.join(", "));
    Some(patch)
}
