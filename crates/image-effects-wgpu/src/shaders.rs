//! Built-in WGSL sources
//!
//! Every built-in render shader binds `mySampler` and `myTexture` in group 0 and
//! its `<type>_uniforms` buffer in group 1. Filter-specific extras (`direction`,
//! `auxTexture`) live in group 2.

pub const COPY: &str = include_str!("shaders/copy.wgsl");
pub const NOISE: &str = include_str!("shaders/noise.wgsl");
pub const WARP: &str = include_str!("shaders/warp.wgsl");
pub const BLUR: &str = include_str!("shaders/blur.wgsl");
pub const BEVEL: &str = include_str!("shaders/bevel.wgsl");

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::filter::BuiltinFilter;
    use crate::reflect::reflect;

    fn parse(source: &str) -> naga::Module {
        naga::front::wgsl::parse_str(source).unwrap()
    }

    #[test]
    fn test_builtin_shaders_validate() {
        for filter in BuiltinFilter::ALL {
            let module = parse(filter.source());
            naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
                .validate(&module)
                .unwrap_or_else(|error| panic!("{} failed validation: {error:?}", filter.name()));
        }
    }

    #[test]
    fn test_reflection_matches_naga_bindings() {
        for filter in BuiltinFilter::ALL {
            let module = parse(filter.source());
            let expected: BTreeSet<(u32, u32, String)> = module
                .global_variables
                .iter()
                .filter_map(|(_, variable)| {
                    let binding = variable.binding.as_ref()?;
                    Some((binding.group, binding.binding, variable.name.clone()?))
                })
                .collect();

            let reflection = reflect(filter.source());
            assert!(reflection.errors.is_empty(), "{}: {:?}", filter.name(), reflection.errors);
            let reflected: BTreeSet<(u32, u32, String)> = reflection.bindings.iter().map(|b| (b.group, b.binding, b.name.clone())).collect();

            assert_eq!(reflected, expected, "{}", filter.name());
        }
    }

    #[test]
    fn test_reflection_matches_naga_entry_points() {
        for filter in BuiltinFilter::ALL {
            let module = parse(filter.source());
            let reflection = reflect(filter.source());

            for entry in &module.entry_points {
                match entry.stage {
                    naga::ShaderStage::Vertex => assert_eq!(reflection.vertex_entry(), entry.name),
                    naga::ShaderStage::Fragment => assert_eq!(reflection.fragment_entry(), entry.name),
                    naga::ShaderStage::Compute => assert_eq!(reflection.workgroup_size(), Some(entry.workgroup_size)),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_conventional_binding_names() {
        for filter in BuiltinFilter::ALL {
            let names: Vec<String> = reflect(filter.source()).bindings.into_iter().map(|b| b.name).collect();
            assert!(names.contains(&"mySampler".to_string()));
            assert!(names.contains(&"myTexture".to_string()));
            if filter != BuiltinFilter::Copy {
                assert!(names.contains(&format!("{}_uniforms", filter.name())), "{}", filter.name());
            }
        }
        assert!(reflect(super::BLUR).bindings.iter().any(|b| b.name == "direction"));
        assert!(reflect(super::BEVEL).bindings.iter().any(|b| b.name == "auxTexture"));
    }
}
