//! C-compatible surface of the glint shader compiler.
//!
//! Two layers live here:
//!
//! - [`ffi`]: `extern "C"` functions over opaque handles, declared for C
//!   callers in `include/glint.h`
//! - [`wrapper`]: owning Rust types that hold those raw handles and release
//!   them on drop
//!
//! Rust code that does not need the C ABI should use `glint_compiler`
//! directly.

pub mod ffi;
pub mod wrapper;

pub use crate::ffi::{
    glint_compile_into_spv, glint_compiler, glint_compiler_initialize, glint_compiler_release,
    glint_compiler_t, glint_module_get_bytes, glint_module_get_error_message,
    glint_module_get_length, glint_module_get_success, glint_module_release, glint_shader_kind,
    glint_spv_module, glint_spv_module_t,
};
pub use crate::wrapper::{Compiler, SpvModule, WrapperError};
