//! Error types for the filter chain
//!
//! Reflection problems are collected rather than raised, registry lookups report
//! exactly why a name could not be bound, and everything that aborts a render
//! call is funnelled into [`FilterChainError`].

use crate::resource_registry::ResourceKind;

/// A problem found while reflecting shader source
///
/// These are never fatal. They are logged and kept on the reflection result;
/// whatever is missing fails later when the pipeline is compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectionError {
    /// A render shader without a `@vertex` entry point
    #[error("no vertex entry point")]
    MissingVertexEntry,
    /// A render shader without a `@fragment` entry point
    #[error("no fragment entry point")]
    MissingFragmentEntry,
    /// A `@group`/`@binding` declaration whose type could not be classified
    #[error("can't classify @group({group}) @binding({binding}) `{name}: {type_name}`")]
    UnclassifiedBinding {
        /// Declared group index
        group: u32,
        /// Declared binding index
        binding: u32,
        /// Variable name
        name: String,
        /// Declared type name
        type_name: String,
    },
    /// A `@workgroup_size` dimension that is not an integer literal
    #[error("unsupported @workgroup_size dimension `{0}`")]
    InvalidWorkgroupSize(String),
    /// A `@group`/`@binding` annotated item that is not a well-formed `var` declaration
    #[error("malformed declaration for @group({group}) @binding({binding})")]
    MalformedDeclaration {
        /// Declared group index
        group: u32,
        /// Declared binding index
        binding: u32,
    },
}

/// Failure to resolve a named resource from the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The name was never populated
    #[error("resource `{name}` has not been set")]
    Unset {
        /// Requested name
        name: String,
    },
    /// The name exists but holds a different kind of resource
    #[error("resource `{name}` is a {found:?}, expected a {expected:?}")]
    WrongKind {
        /// Requested name
        name: String,
        /// Kind the binding slot needs
        expected: ResourceKind,
        /// Kind actually stored
        found: ResourceKind,
    },
    /// The name holds an array that has no element at the requested index
    #[error("resource array `{name}` has {len} elements, index {index} requested")]
    IndexOutOfRange {
        /// Requested name
        name: String,
        /// Requested element
        index: usize,
        /// Array length
        len: usize,
    },
}

/// Errors that abort a render call
#[derive(Debug, thiserror::Error)]
pub enum FilterChainError {
    /// A bind group entry could not be resolved
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A filter type with no built-in shader and no caller-supplied code
    #[error("unknown filter type `{0}`")]
    UnknownFilterType(String),
    /// wgpu rejected the shader module or pipeline
    #[error("failed to compile pipeline `{name}`: {message}")]
    PipelineCompilation {
        /// Logical filter name
        name: String,
        /// Validation message reported by wgpu
        message: String,
    },
    /// wgpu rejected the recorded passes, e.g. a uniform buffer smaller than the shader's struct
    #[error("filter chain failed validation: {message}")]
    Validation {
        /// Validation message reported by wgpu
        message: String,
    },
    /// A zero-sized image was supplied
    #[error("image has zero size ({width}x{height})")]
    EmptyImage {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },
    /// Rendering was requested before any image was loaded
    #[error("no image has been loaded")]
    NotLoaded,
    /// The presentation surface could not provide a texture
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    /// No suitable adapter was found
    #[error(transparent)]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    /// The adapter refused to create a device
    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

pub type Result<T, E = FilterChainError> = std::result::Result<T, E>;
