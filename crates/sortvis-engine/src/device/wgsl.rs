//! WGSL front-end checks shared by every device implementation.
//!
//! Compilation is modelled on GL: a failed compile leaves a human-readable info
//! log behind instead of returning an error to the caller.
//!
//! Modules are validated with no optional capabilities, so anything accepted
//! here is accepted by every adapter wgpu can hand out.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::{NumericKind, ShaderStage};

/// One user-defined (`@location`) input or output of an entry point.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageIo {
    pub location: u32,
    pub kind: NumericKind,
    pub components: u8,
    pub interpolation: Option<naga::Interpolation>,
    pub sampling: Option<naga::Sampling>,
}

impl StageIo {
    /// Same location, type and interpolation, with WGSL defaults filled in.
    pub fn matches(&self, other: &StageIo) -> bool {
        self.location == other.location
            && self.kind == other.kind
            && self.components == other.components
            && self.resolved_interpolation() == other.resolved_interpolation()
    }

    fn resolved_interpolation(&self) -> (naga::Interpolation, naga::Sampling) {
        let default = match self.kind {
            NumericKind::Float => naga::Interpolation::Perspective,
            NumericKind::Sint | NumericKind::Uint => naga::Interpolation::Flat,
        };
        (
            self.interpolation.unwrap_or(default),
            self.sampling.unwrap_or(naga::Sampling::Center),
        )
    }
}

/// Location-bound inputs and outputs of an entry point, sorted by location.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StageInterface {
    pub inputs: Vec<StageIo>,
    pub outputs: Vec<StageIo>,
}

/// Outcome of compiling one shader object.
#[derive(Debug, Clone)]
pub(crate) enum Compiled {
    Ok {
        entry_point: String,
        interface: StageInterface,
    },
    Failed {
        log: String,
    },
}

/// Parses and validates `source`, then locates the entry point for `stage`.
pub(crate) fn compile(stage: ShaderStage, source: &str) -> Compiled {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(m) => m,
        Err(err) => {
            return Compiled::Failed {
                log: err.emit_to_string(source),
            }
        }
    };

    if let Err(err) = Validator::new(ValidationFlags::all(), Capabilities::empty()).validate(&module)
    {
        return Compiled::Failed {
            log: format!("validation error: {}", err.as_inner()),
        };
    }

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    match module.entry_points.iter().find(|ep| ep.stage == wanted) {
        Some(ep) => Compiled::Ok {
            entry_point: ep.name.clone(),
            interface: interface(&module, &ep.function),
        },
        None => Compiled::Failed {
            log: format!("no @{stage} entry point found"),
        },
    }
}

fn interface(module: &naga::Module, function: &naga::Function) -> StageInterface {
    let mut iface = StageInterface::default();
    for arg in &function.arguments {
        collect(module, arg.ty, arg.binding.as_ref(), &mut iface.inputs);
    }
    if let Some(result) = &function.result {
        collect(module, result.ty, result.binding.as_ref(), &mut iface.outputs);
    }
    iface.inputs.sort_by_key(|io| io.location);
    iface.outputs.sort_by_key(|io| io.location);
    iface
}

/// Gathers location bindings of `ty`, descending into unbound structs.
fn collect(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<StageIo>,
) {
    match binding {
        Some(naga::Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => {
            if let Some((kind, components)) = numeric(&module.types[ty].inner) {
                out.push(StageIo {
                    location: *location,
                    kind,
                    components,
                    interpolation: *interpolation,
                    sampling: *sampling,
                });
            }
        }
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn numeric(inner: &naga::TypeInner) -> Option<(NumericKind, u8)> {
    let (scalar, components) = match *inner {
        naga::TypeInner::Scalar(scalar) => (scalar, 1),
        naga::TypeInner::Vector { size, scalar } => (scalar, size as u8),
        _ => return None,
    };
    let kind = match scalar.kind {
        naga::ScalarKind::Float => NumericKind::Float,
        naga::ScalarKind::Sint => NumericKind::Sint,
        naga::ScalarKind::Uint => NumericKind::Uint,
        _ => return None,
    };
    Some((kind, components))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ok(stage: ShaderStage, source: &str) -> (String, StageInterface) {
        match compile(stage, source) {
            Compiled::Ok {
                entry_point,
                interface,
            } => (entry_point, interface),
            Compiled::Failed { log } => panic!("unexpected failure: {log}"),
        }
    }

    #[test]
    fn valid_vertex_source_finds_entry_point() {
        let (entry_point, _) = ok(ShaderStage::Vertex, fixtures::VERTEX);
        assert_eq!(entry_point, "vs_main");
    }

    #[test]
    fn syntax_error_produces_log() {
        let Compiled::Failed { log } = compile(ShaderStage::Vertex, fixtures::BROKEN) else {
            panic!("broken source compiled");
        };
        assert!(!log.is_empty());
    }

    #[test]
    fn stage_mismatch_is_a_failure() {
        let Compiled::Failed { log } = compile(ShaderStage::Fragment, fixtures::VERTEX) else {
            panic!("vertex-only module accepted as fragment");
        };
        assert!(log.contains("fragment"));
    }

    #[test]
    fn optional_capabilities_are_rejected() {
        // Per-sample shading is not available on every adapter.
        let source = r#"
@fragment
fn fs_main(@builtin(sample_index) sample: u32) -> @location(0) vec4<f32> {
    return vec4<f32>(f32(sample), 0.0, 0.0, 1.0);
}
"#;
        let Compiled::Failed { log } = compile(ShaderStage::Fragment, source) else {
            panic!("sample_index accepted without per-sample shading");
        };
        assert!(log.contains("validation error"));
    }

    // ── interfaces ────────────────────────────────────────────────────────

    #[test]
    fn vertex_inputs_and_struct_outputs_are_collected() {
        let (_, iface) = ok(ShaderStage::Vertex, fixtures::VERTEX_COLORED);

        let inputs: Vec<_> = iface
            .inputs
            .iter()
            .map(|io| (io.location, io.kind, io.components))
            .collect();
        assert_eq!(
            inputs,
            vec![(0, NumericKind::Float, 2), (1, NumericKind::Float, 3)]
        );

        // The builtin position is not a location output.
        assert_eq!(iface.outputs.len(), 1);
        assert_eq!(iface.outputs[0].location, 0);
        assert_eq!(iface.outputs[0].components, 3);
    }

    #[test]
    fn integer_inputs_keep_their_kind() {
        let (_, iface) = ok(ShaderStage::Vertex, fixtures::VERTEX_INT);
        assert_eq!(iface.inputs[0].kind, NumericKind::Sint);
        assert_eq!(iface.inputs[0].components, 2);
    }

    #[test]
    fn fragment_output_is_collected() {
        let (_, iface) = ok(ShaderStage::Fragment, fixtures::FRAGMENT);
        assert!(iface.inputs.is_empty());
        assert_eq!(iface.outputs[0].kind, NumericKind::Float);
        assert_eq!(iface.outputs[0].components, 4);
    }
}
