//! WGSL shader reflection
//!
//! A small tokenizer and parser over the part of WGSL that decides how a shader
//! has to be wired up: entry-point attributes (`@vertex`, `@fragment`,
//! `@compute @workgroup_size(..)`) and resource declarations
//! (`@group(g) @binding(b) var<...> name: type<...>;`). Everything else in the
//! source is skipped.
//!
//! Reflection never fails outright. Problems are logged, kept in
//! [`ShaderReflection::errors`] and the result carries whatever could be read.

use crate::error::ReflectionError;

/// Resource kind of a reflected binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var<uniform>` or `var<storage>` buffer
    Buffer {
        /// Address space of the declaration
        space: BufferSpace,
    },
    /// `sampler` or `sampler_comparison`
    Sampler {
        /// Whether this is a comparison sampler
        comparison: bool,
    },
    /// Sampled texture (`texture_2d<f32>`, `texture_depth_2d`, ...)
    Texture {
        /// Sample type derived from the texel type argument
        sample_type: wgpu::TextureSampleType,
        /// Whether the texture is multisampled
        multisampled: bool,
    },
    /// Storage texture (`texture_storage_2d<rgba8unorm, write>`)
    StorageTexture {
        /// Declared access mode
        access: wgpu::StorageTextureAccess,
    },
}

/// Address space of a buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSpace {
    Uniform,
    Storage { read_only: bool },
}

/// Metadata for a single `@group`/`@binding` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderBindingInfo {
    /// Bind group index
    pub group: u32,
    /// Binding index within the group
    pub binding: u32,
    /// Classified resource kind
    pub kind: BindingKind,
    /// Variable name, used as the resource registry key
    pub name: String,
    /// Stages the binding is visible to
    pub visibility: wgpu::ShaderStages,
    /// Texture view dimension (2D for non-texture bindings)
    pub view_dimension: wgpu::TextureViewDimension,
    /// Texel format of storage textures
    pub format: Option<wgpu::TextureFormat>,
}

/// Entry points found in the shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderStageKind {
    /// Vertex/fragment pair; a missing entry is left empty
    Render { vertex_entry: String, fragment_entry: String },
    /// Compute entry point with its workgroup size
    Compute { entry: String, workgroup_size: [u32; 3] },
}

/// Result of reflecting one shader source
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderReflection {
    /// Entry points
    pub stage: ShaderStageKind,
    /// Classified bindings in declaration order
    pub bindings: Vec<ShaderBindingInfo>,
    /// Non-fatal problems found while reflecting
    pub errors: Vec<ReflectionError>,
}

impl ShaderReflection {
    pub fn is_compute(&self) -> bool {
        matches!(self.stage, ShaderStageKind::Compute { .. })
    }

    pub fn vertex_entry(&self) -> &str {
        match &self.stage {
            ShaderStageKind::Render { vertex_entry, .. } => vertex_entry,
            ShaderStageKind::Compute { .. } => "",
        }
    }

    pub fn fragment_entry(&self) -> &str {
        match &self.stage {
            ShaderStageKind::Render { fragment_entry, .. } => fragment_entry,
            ShaderStageKind::Compute { .. } => "",
        }
    }

    pub fn compute_entry(&self) -> &str {
        match &self.stage {
            ShaderStageKind::Compute { entry, .. } => entry,
            ShaderStageKind::Render { .. } => "",
        }
    }

    pub fn workgroup_size(&self) -> Option<[u32; 3]> {
        match &self.stage {
            ShaderStageKind::Compute { workgroup_size, .. } => Some(*workgroup_size),
            ShaderStageKind::Render { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Number(&'a str),
    Punct(char),
}

impl Token<'_> {
    fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::Number(s) => (*s).to_string(),
            Token::Punct(c) => c.to_string(),
        }
    }
}

/// Splits WGSL source into identifiers, numbers and single-character punctuation
///
/// Line comments and (nested) block comments are dropped.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if bytes[i..].starts_with(b"//") {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if bytes[i..].starts_with(b"/*") {
            let mut depth = 0;
            while i < bytes.len() {
                if bytes[i..].starts_with(b"/*") {
                    depth += 1;
                    i += 2;
                } else if bytes[i..].starts_with(b"*/") {
                    depth -= 1;
                    i += 2;
                    if depth == 0 {
                        break;
                    }
                } else {
                    i += 1;
                }
            }
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(&source[start..i]));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Number(&source[start..i]));
        } else {
            // Non-ASCII characters only occur in identifiers we never inspect.
            let ch = source[i..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
            tokens.push(Token::Punct(ch));
            i += ch.len_utf8();
        }
    }

    tokens
}

/// A parsed `@name(args)` attribute
#[derive(Debug)]
struct Attribute<'a> {
    name: &'a str,
    args: Vec<String>,
}

/// A parsed `var<space, access> name: type<args>;` declaration
#[derive(Debug)]
struct VarDecl<'a> {
    address_space: Option<&'a str>,
    access: Option<&'a str>,
    name: &'a str,
    type_name: &'a str,
    type_args: Vec<String>,
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self { tokens: tokenize(source), pos: 0 }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Some(name)
            }
            _ => None,
        }
    }

    /// Reads comma-separated arguments up to the matching `close` delimiter
    ///
    /// The opening delimiter must already be consumed. Nested `()`/`<>` groups
    /// are kept together inside a single argument.
    fn delimited_args(&mut self, open: char, close: char) -> Vec<String> {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;

        while let Some(token) = self.bump() {
            match token {
                Token::Punct(c) if c == close && depth == 0 => break,
                Token::Punct(',') if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                    continue;
                }
                Token::Punct(c) if c == open => depth += 1,
                Token::Punct(c) if c == close => depth -= 1,
                _ => {}
            }
            current.push_str(&token.text());
        }

        if !current.is_empty() {
            args.push(current);
        }
        args
    }

    /// Parses a run of consecutive attributes starting at `@`
    fn attributes(&mut self) -> Vec<Attribute<'a>> {
        let mut attributes = Vec::new();
        while self.eat('@') {
            let Some(name) = self.ident() else {
                break;
            };
            let args = if self.eat('(') { self.delimited_args('(', ')') } else { Vec::new() };
            attributes.push(Attribute { name, args });
        }
        attributes
    }

    /// Parses the remainder of a `var` declaration, `var` itself already consumed
    fn var_decl(&mut self) -> Option<VarDecl<'a>> {
        let (mut address_space, mut access) = (None, None);
        if self.eat('<') {
            address_space = self.ident();
            if self.eat(',') {
                access = self.ident();
            }
            if !self.eat('>') {
                return None;
            }
        }

        let name = self.ident()?;
        if !self.eat(':') {
            return None;
        }
        let type_name = self.ident()?;
        let type_args = if self.eat('<') { self.delimited_args('<', '>') } else { Vec::new() };
        if !self.eat(';') {
            return None;
        }

        Some(VarDecl {
            address_space,
            access,
            name,
            type_name,
            type_args,
        })
    }
}

fn attribute<'b, 'a>(attributes: &'b [Attribute<'a>], name: &str) -> Option<&'b Attribute<'a>> {
    attributes.iter().find(|attribute| attribute.name == name)
}

fn index_attribute(attributes: &[Attribute<'_>], name: &str) -> Option<u32> {
    attribute(attributes, name)?.args.first()?.trim_end_matches(['u', 'i']).parse().ok()
}

/// Maps a WGSL texel format name to the matching wgpu format
fn parse_texel_format(name: &str) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;
    Some(match name {
        "rgba8unorm" => F::Rgba8Unorm,
        "rgba8snorm" => F::Rgba8Snorm,
        "rgba8uint" => F::Rgba8Uint,
        "rgba8sint" => F::Rgba8Sint,
        "bgra8unorm" => F::Bgra8Unorm,
        "rgba16uint" => F::Rgba16Uint,
        "rgba16sint" => F::Rgba16Sint,
        "rgba16float" => F::Rgba16Float,
        "r32uint" => F::R32Uint,
        "r32sint" => F::R32Sint,
        "r32float" => F::R32Float,
        "rg32uint" => F::Rg32Uint,
        "rg32sint" => F::Rg32Sint,
        "rg32float" => F::Rg32Float,
        "rgba32uint" => F::Rgba32Uint,
        "rgba32sint" => F::Rgba32Sint,
        "rgba32float" => F::Rgba32Float,
        _ => return None,
    })
}

fn parse_view_dimension(suffix: &str) -> Option<wgpu::TextureViewDimension> {
    use wgpu::TextureViewDimension as D;
    Some(match suffix {
        "1d" => D::D1,
        "2d" => D::D2,
        "2d_array" => D::D2Array,
        "3d" => D::D3,
        "cube" => D::Cube,
        "cube_array" => D::CubeArray,
        _ => return None,
    })
}

/// Classified binding: kind, view dimension and storage format
type Classified = (BindingKind, wgpu::TextureViewDimension, Option<wgpu::TextureFormat>);

/// Classifies a declaration from its address space and declared type
fn classify(decl: &VarDecl<'_>) -> Option<Classified> {
    let type_name = decl.type_name;

    if type_name == "sampler" {
        return Some((BindingKind::Sampler { comparison: false }, wgpu::TextureViewDimension::D2, None));
    }
    if type_name == "sampler_comparison" {
        return Some((BindingKind::Sampler { comparison: true }, wgpu::TextureViewDimension::D2, None));
    }

    if type_name.contains("texture") {
        let segments: Vec<&str> = type_name.split('_').collect();
        let storage = segments.contains(&"storage");
        let depth = segments.contains(&"depth");
        let multisampled = segments.contains(&"multisampled");
        let suffix = segments
            .iter()
            .filter(|segment| !matches!(**segment, "texture" | "storage" | "depth" | "multisampled"))
            .copied()
            .collect::<Vec<_>>()
            .join("_");
        let view_dimension = parse_view_dimension(&suffix)?;

        if storage {
            let format = parse_texel_format(decl.type_args.first()?)?;
            let access = match decl.type_args.get(1).map(String::as_str) {
                Some("read") => wgpu::StorageTextureAccess::ReadOnly,
                Some("read_write") => wgpu::StorageTextureAccess::ReadWrite,
                _ => wgpu::StorageTextureAccess::WriteOnly,
            };
            return Some((BindingKind::StorageTexture { access }, view_dimension, Some(format)));
        }

        let sample_type = if depth {
            wgpu::TextureSampleType::Depth
        } else {
            match decl.type_args.first().map(String::as_str) {
                Some("i32") => wgpu::TextureSampleType::Sint,
                Some("u32") => wgpu::TextureSampleType::Uint,
                _ => wgpu::TextureSampleType::Float { filterable: !multisampled },
            }
        };
        return Some((BindingKind::Texture { sample_type, multisampled }, view_dimension, None));
    }

    let space = match decl.address_space? {
        "uniform" => BufferSpace::Uniform,
        "storage" => BufferSpace::Storage {
            read_only: decl.access != Some("read_write"),
        },
        _ => return None,
    };
    Some((BindingKind::Buffer { space }, wgpu::TextureViewDimension::D2, None))
}

/// A binding as parsed, before visibility is known
struct RawBinding {
    group: u32,
    binding: u32,
    name: String,
    classified: Classified,
}

/// Reflects WGSL source into entry points and binding metadata
///
/// A `@compute` entry point makes the whole shader a compute shader; otherwise
/// the first `@vertex` and `@fragment` functions are used. Every binding
/// inherits the visibility of the entry points that were found.
///
/// # Arguments
/// * `source` - WGSL shader source text
///
/// # Returns
/// The reflection result; problems are reported in its `errors` field
pub fn reflect(source: &str) -> ShaderReflection {
    let mut parser = Parser::new(source);
    let mut errors = Vec::new();
    let mut raw_bindings = Vec::new();
    let mut vertex_entry = None;
    let mut fragment_entry = None;
    let mut compute_entry: Option<(String, [u32; 3])> = None;

    while let Some(token) = parser.peek() {
        if token != Token::Punct('@') {
            parser.bump();
            continue;
        }

        let attributes = parser.attributes();
        match parser.peek() {
            Some(Token::Ident("fn")) => {
                parser.bump();
                let Some(name) = parser.ident() else {
                    continue;
                };
                if attribute(&attributes, "compute").is_some() {
                    if compute_entry.is_none() {
                        let size = workgroup_size(attribute(&attributes, "workgroup_size"), &mut errors);
                        compute_entry = Some((name.to_string(), size));
                    }
                } else if attribute(&attributes, "vertex").is_some() {
                    vertex_entry.get_or_insert_with(|| name.to_string());
                } else if attribute(&attributes, "fragment").is_some() {
                    fragment_entry.get_or_insert_with(|| name.to_string());
                }
            }
            Some(Token::Ident("var")) => {
                let (Some(group), Some(binding)) = (index_attribute(&attributes, "group"), index_attribute(&attributes, "binding")) else {
                    continue;
                };
                parser.bump();
                let Some(decl) = parser.var_decl() else {
                    errors.push(ReflectionError::MalformedDeclaration { group, binding });
                    continue;
                };
                match classify(&decl) {
                    Some(classified) => raw_bindings.push(RawBinding {
                        group,
                        binding,
                        name: decl.name.to_string(),
                        classified,
                    }),
                    None => errors.push(ReflectionError::UnclassifiedBinding {
                        group,
                        binding,
                        name: decl.name.to_string(),
                        type_name: decl.type_name.to_string(),
                    }),
                }
            }
            _ => {}
        }
    }

    let (stage, visibility) = match compute_entry {
        Some((entry, workgroup_size)) => (ShaderStageKind::Compute { entry, workgroup_size }, wgpu::ShaderStages::COMPUTE),
        None => {
            let mut visibility = wgpu::ShaderStages::NONE;
            if vertex_entry.is_some() {
                visibility |= wgpu::ShaderStages::VERTEX;
            } else {
                errors.push(ReflectionError::MissingVertexEntry);
            }
            if fragment_entry.is_some() {
                visibility |= wgpu::ShaderStages::FRAGMENT;
            } else {
                errors.push(ReflectionError::MissingFragmentEntry);
            }
            let stage = ShaderStageKind::Render {
                vertex_entry: vertex_entry.unwrap_or_default(),
                fragment_entry: fragment_entry.unwrap_or_default(),
            };
            (stage, visibility)
        }
    };

    for error in &errors {
        tracing::error!(%error, "shader reflection");
    }

    let bindings = raw_bindings
        .into_iter()
        .map(|raw| {
            let (kind, view_dimension, format) = raw.classified;
            ShaderBindingInfo {
                group: raw.group,
                binding: raw.binding,
                kind,
                name: raw.name,
                visibility,
                view_dimension,
                format,
            }
        })
        .collect();

    ShaderReflection { stage, bindings, errors }
}

/// Reads `@workgroup_size(x[, y[, z]])`; missing or non-literal dimensions become 1
fn workgroup_size(attribute: Option<&Attribute<'_>>, errors: &mut Vec<ReflectionError>) -> [u32; 3] {
    let mut size = [1; 3];
    let Some(attribute) = attribute else {
        return size;
    };
    for (dimension, arg) in size.iter_mut().zip(&attribute.args) {
        match arg.trim_end_matches(['u', 'i']).parse() {
            Ok(value) => *dimension = value,
            Err(_) => errors.push(ReflectionError::InvalidWorkgroupSize(arg.clone())),
        }
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDER_SHADER: &str = r#"
struct Uniforms {
    intensity: f32,
    center: vec2<f32>,
}

// @group(3) @binding(0) var commented: sampler;
/* @group(3) @binding(1) var<uniform> also_commented: Uniforms; /* nested */ */
@group(0) @binding(0) var mySampler: sampler;
@group(0) @binding(1) var myTexture: texture_2d<f32>;
@group(1) @binding(0) var<uniform> warp_uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vert_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn frag_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(myTexture, mySampler, in.uv);
}
"#;

    #[test]
    fn test_render_shader_reflection() {
        let reflection = reflect(RENDER_SHADER);
        assert!(reflection.errors.is_empty(), "{:?}", reflection.errors);
        assert!(!reflection.is_compute());
        assert_eq!(reflection.vertex_entry(), "vert_main");
        assert_eq!(reflection.fragment_entry(), "frag_main");
        assert_eq!(reflection.workgroup_size(), None);

        let names: Vec<_> = reflection.bindings.iter().map(|b| (b.group, b.binding, b.name.as_str())).collect();
        assert_eq!(names, vec![(0, 0, "mySampler"), (0, 1, "myTexture"), (1, 0, "warp_uniforms")]);

        assert_eq!(reflection.bindings[0].kind, BindingKind::Sampler { comparison: false });
        assert_eq!(
            reflection.bindings[1].kind,
            BindingKind::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                multisampled: false,
            }
        );
        assert_eq!(reflection.bindings[2].kind, BindingKind::Buffer { space: BufferSpace::Uniform });

        for binding in &reflection.bindings {
            assert_eq!(binding.visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
        }
    }

    #[test]
    fn test_compute_shader_reflection() {
        let source = r#"
@group(0) @binding(0) var myTexture: texture_2d<f32>;
@group(0) @binding(1) var outputTexture: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var<storage, read_write> histogram: array<atomic<u32>, 256>;
@group(0) @binding(3) var<storage> weights: array<f32>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let color = textureLoad(myTexture, vec2<i32>(id.xy), 0);
    textureStore(outputTexture, vec2<i32>(id.xy), color);
}
"#;
        let reflection = reflect(source);
        assert!(reflection.errors.is_empty(), "{:?}", reflection.errors);
        assert!(reflection.is_compute());
        assert_eq!(reflection.compute_entry(), "main");
        assert_eq!(reflection.workgroup_size(), Some([8, 8, 1]));
        assert_eq!(reflection.vertex_entry(), "");

        let output = &reflection.bindings[1];
        assert_eq!(
            output.kind,
            BindingKind::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly
            }
        );
        assert_eq!(output.format, Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(output.view_dimension, wgpu::TextureViewDimension::D2);
        assert_eq!(
            reflection.bindings[2].kind,
            BindingKind::Buffer {
                space: BufferSpace::Storage { read_only: false }
            }
        );
        assert_eq!(
            reflection.bindings[3].kind,
            BindingKind::Buffer {
                space: BufferSpace::Storage { read_only: true }
            }
        );
        assert!(reflection.bindings.iter().all(|b| b.visibility == wgpu::ShaderStages::COMPUTE));
    }

    #[test]
    fn test_missing_fragment_entry_is_reported_not_fatal() {
        let source = r#"
@group(0) @binding(0) var mySampler: sampler;
@vertex fn vs(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }
"#;
        let reflection = reflect(source);
        assert_eq!(reflection.errors, vec![ReflectionError::MissingFragmentEntry]);
        assert_eq!(reflection.vertex_entry(), "vs");
        assert_eq!(reflection.fragment_entry(), "");
        assert_eq!(reflection.bindings.len(), 1);
        assert_eq!(reflection.bindings[0].visibility, wgpu::ShaderStages::VERTEX);
    }

    #[test]
    fn test_unclassifiable_binding_is_excluded() {
        let source = r#"
@group(0) @binding(0) var mySampler: sampler;
@group(0) @binding(1) var mystery: f32;
@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
"#;
        let reflection = reflect(source);
        assert_eq!(reflection.bindings.len(), 1);
        assert_eq!(
            reflection.errors,
            vec![ReflectionError::UnclassifiedBinding {
                group: 0,
                binding: 1,
                name: "mystery".to_string(),
                type_name: "f32".to_string(),
            }]
        );
    }

    #[test]
    fn test_texture_variants() {
        let source = r#"
@group(0) @binding(0) var layers: texture_2d_array<f32>;
@group(0) @binding(1) var shadow: texture_depth_2d;
@group(0) @binding(2) var ids: texture_2d<u32>;
@group(0) @binding(3) var env: texture_cube<f32>;
@group(0) @binding(4) var cmp: sampler_comparison;
@group(0) @binding(5) var ms: texture_multisampled_2d<f32>;
@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
"#;
        let reflection = reflect(source);
        assert!(reflection.errors.is_empty(), "{:?}", reflection.errors);
        let b = &reflection.bindings;
        assert_eq!(b[0].view_dimension, wgpu::TextureViewDimension::D2Array);
        assert_eq!(
            b[1].kind,
            BindingKind::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                multisampled: false
            }
        );
        assert_eq!(
            b[2].kind,
            BindingKind::Texture {
                sample_type: wgpu::TextureSampleType::Uint,
                multisampled: false
            }
        );
        assert_eq!(b[3].view_dimension, wgpu::TextureViewDimension::Cube);
        assert_eq!(b[4].kind, BindingKind::Sampler { comparison: true });
        assert_eq!(
            b[5].kind,
            BindingKind::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                multisampled: true
            }
        );
    }

    #[test]
    fn test_non_literal_workgroup_size_falls_back() {
        let source = r#"
override block: u32 = 16;
@compute @workgroup_size(block, 4)
fn main() {}
"#;
        let reflection = reflect(source);
        assert_eq!(reflection.workgroup_size(), Some([1, 4, 1]));
        assert_eq!(reflection.errors, vec![ReflectionError::InvalidWorkgroupSize("block".to_string())]);
    }

    #[test]
    fn test_compute_entry_wins_over_render_entries() {
        let source = r#"
@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
@compute @workgroup_size(64u) fn cs() {}
"#;
        let reflection = reflect(source);
        assert_eq!(
            reflection.stage,
            ShaderStageKind::Compute {
                entry: "cs".to_string(),
                workgroup_size: [64, 1, 1]
            }
        );
        assert!(reflection.errors.is_empty());
    }
}
