//! Filter descriptors and the built-in filter catalogue
//!
//! A chain is an ordered list of [`FilterDescriptor`]s. Each one names a filter
//! type, optionally carries its own WGSL source, and lists named numeric
//! properties that are packed into the filter's uniform buffer in order.

use serde::{Deserialize, Serialize};

use crate::shaders;

/// Value of a filter property
///
/// Deserializes from a JSON number or an array of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(f32),
    Vector(Vec<f32>),
}

impl PropertyValue {
    pub fn as_slice(&self) -> &[f32] {
        match self {
            PropertyValue::Scalar(value) => std::slice::from_ref(value),
            PropertyValue::Vector(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl<const N: usize> From<[f32; N]> for PropertyValue {
    fn from(values: [f32; N]) -> Self {
        PropertyValue::Vector(values.to_vec())
    }
}

/// A named property, packed in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
}

fn enabled_by_default() -> bool {
    true
}

/// One stage of a filter chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    /// Filter type; also the pipeline cache key and uniform buffer prefix
    pub filter_type: String,
    /// Disabled stages are skipped entirely
    #[serde(default = "enabled_by_default", alias = "enable")]
    pub enabled: bool,
    /// WGSL source replacing the built-in shader for this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Uniform properties in packing order
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// Parameters of the bevel filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevelParams {
    pub light_dir: [f32; 3],
    pub light_color: [f32; 4],
    pub shadow_color: [f32; 4],
    pub depth: [f32; 3],
    pub size: f32,
    pub soft: f32,
    pub contour: f32,
}

impl Default for BevelParams {
    fn default() -> Self {
        Self {
            light_dir: [0.5, 0.5, 1.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            shadow_color: [0.0, 0.0, 0.0, 1.0],
            depth: [0.1, 0.1, 0.1],
            size: 0.1,
            soft: 0.1,
            contour: 1.0,
        }
    }
}

impl FilterDescriptor {
    /// Creates an enabled descriptor with no properties
    pub fn new(filter_type: impl Into<String>) -> Self {
        Self {
            filter_type: filter_type.into(),
            enabled: true,
            code: None,
            properties: Vec::new(),
        }
    }

    /// Grain noise; `intensity` in `[0, 100]`, `granularity` is the grain size in pixels
    pub fn noise(intensity: f32, seed: f32, granularity: f32) -> Self {
        Self::new(BuiltinFilter::Noise.name())
            .with_property("intensity", intensity)
            .with_property("seed", seed)
            .with_property("granularity", granularity)
    }

    /// Swirl around `center` (uv coordinates); `intensity` is the twist in 5 degree steps
    pub fn warp(intensity: f32, center: [f32; 2]) -> Self {
        Self::new(BuiltinFilter::Warp.name()).with_property("intensity", intensity).with_property("center", center)
    }

    /// Separable gaussian blur; `intensity` is the radius in pixels
    pub fn blur(intensity: f32) -> Self {
        Self::new(BuiltinFilter::Blur.name()).with_property("intensity", intensity)
    }

    /// Bevel shading driven by the auxiliary texture
    pub fn bevel(params: BevelParams) -> Self {
        Self::new(BuiltinFilter::Bevel.name())
            .with_property("lightDir", params.light_dir)
            .with_property("lightColor", params.light_color)
            .with_property("shadowColor", params.shadow_color)
            .with_property("depth", params.depth)
            .with_property("size", params.size)
            .with_property("soft", params.soft)
            .with_property("contour", params.contour)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|property| property.key == key).map(|property| &property.value)
    }

    /// First component of the `intensity` property, if present
    pub fn intensity(&self) -> Option<f32> {
        self.property("intensity")?.as_slice().first().copied()
    }

    /// Whether the stage should be skipped because its intensity is not a finite number
    pub fn is_noop(&self) -> bool {
        self.intensity().is_some_and(|intensity| !intensity.is_finite())
    }

    /// Name of the registry buffer holding this filter's uniforms
    pub fn uniform_name(&self) -> String {
        format!("{}_uniforms", self.filter_type)
    }

    /// Number of passes; blur runs once per entry of [`BLUR_DIRECTIONS`]
    pub fn passes(&self) -> usize {
        if self.filter_type == BuiltinFilter::Blur.name() { BLUR_DIRECTIONS.len() } else { 1 }
    }
}

/// Packs properties into a flat `f32` array
///
/// Every property occupies `stride` floats, where `stride` is the length of the
/// longest property. Shorter values are zero-padded, so a scalar followed by a
/// `vec2` packs as `[s, 0, x, y]`, matching WGSL's alignment of that struct.
pub fn flatten_properties(properties: &[Property]) -> Vec<f32> {
    let stride = properties.iter().map(|property| property.value.len()).max().unwrap_or(0);

    let mut data = Vec::with_capacity(stride * properties.len());
    for property in properties {
        let values = property.value.as_slice();
        data.extend_from_slice(values);
        data.extend(std::iter::repeat_n(0.0, stride - values.len()));
    }
    data
}

/// Filters that ship with a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFilter {
    Noise,
    Warp,
    Blur,
    Bevel,
    /// Pass-through, also used for the final output pass
    Copy,
}

impl BuiltinFilter {
    pub const ALL: [BuiltinFilter; 5] = [BuiltinFilter::Noise, BuiltinFilter::Warp, BuiltinFilter::Blur, BuiltinFilter::Bevel, BuiltinFilter::Copy];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFilter::Noise => "noise",
            BuiltinFilter::Warp => "warp",
            BuiltinFilter::Blur => "blur",
            BuiltinFilter::Bevel => "bevel",
            BuiltinFilter::Copy => "copy",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            BuiltinFilter::Noise => shaders::NOISE,
            BuiltinFilter::Warp => shaders::WARP,
            BuiltinFilter::Blur => shaders::BLUR,
            BuiltinFilter::Bevel => shaders::BEVEL,
            BuiltinFilter::Copy => shaders::COPY,
        }
    }
}

/// Per-pass `direction` values of the two-pass blur
pub const BLUR_DIRECTIONS: [[f32; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];

/// Name of the blur direction array in the registry
pub const DIRECTION: &str = "direction";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_pads_to_widest_property() {
        let warp = FilterDescriptor::warp(5.0, [0.1, 0.2]);
        assert_eq!(flatten_properties(&warp.properties), vec![5.0, 0.0, 0.1, 0.2]);

        let noise = FilterDescriptor::noise(30.0, 7.0, 2.0);
        assert_eq!(flatten_properties(&noise.properties), vec![30.0, 7.0, 2.0]);

        assert!(flatten_properties(&[]).is_empty());
    }

    #[test]
    fn test_bevel_packs_as_vec4_rows() {
        let data = flatten_properties(&FilterDescriptor::bevel(BevelParams::default()).properties);
        assert_eq!(data.len(), 7 * 4);
        assert_eq!(&data[0..4], &[0.5, 0.5, 1.0, 0.0]);
        assert_eq!(&data[12..16], &[0.1, 0.1, 0.1, 0.0]);
        assert_eq!(&data[16..20], &[0.1, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_intensity_is_noop() {
        assert!(FilterDescriptor::blur(f32::NAN).is_noop());
        assert!(FilterDescriptor::blur(f32::INFINITY).is_noop());
        assert!(!FilterDescriptor::blur(3.0).is_noop());
        assert!(!FilterDescriptor::bevel(BevelParams::default()).is_noop());
    }

    #[test]
    fn test_deserialize_chain() {
        let json = r#"[
            { "filterType": "noise", "enable": true, "properties": [
                { "key": "intensity", "value": 40 },
                { "key": "seed", "value": 1 },
                { "key": "granularity", "value": 2 }
            ] },
            { "filterType": "warp", "properties": [
                { "key": "intensity", "value": 3 },
                { "key": "center", "value": [0.5, 0.5] }
            ] },
            { "filterType": "blur", "enabled": false, "properties": [] },
            { "filterType": "invert", "code": "// custom" }
        ]"#;
        let chain: Vec<FilterDescriptor> = serde_json::from_str(json).unwrap();

        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0], FilterDescriptor::noise(40.0, 1.0, 2.0));
        assert_eq!(chain[1].property("center"), Some(&PropertyValue::Vector(vec![0.5, 0.5])));
        assert!(chain[1].enabled);
        assert!(!chain[2].enabled);
        assert_eq!(chain[3].code.as_deref(), Some("// custom"));
        assert_eq!(chain[3].uniform_name(), "invert_uniforms");
    }

    #[test]
    fn test_only_blur_is_two_pass() {
        assert_eq!(FilterDescriptor::blur(2.0).passes(), 2);
        assert_eq!(FilterDescriptor::blur(2.0).with_code("// custom blur").passes(), 2);
        assert_eq!(FilterDescriptor::warp(1.0, [0.5, 0.5]).passes(), 1);
        assert_eq!(FilterDescriptor::new("invert").passes(), 1);
    }

    #[test]
    fn test_builtin_lookup() {
        for filter in BuiltinFilter::ALL {
            assert_eq!(BuiltinFilter::from_name(filter.name()), Some(filter));
        }
        assert_eq!(BuiltinFilter::from_name("sharpen"), None);
    }
}
