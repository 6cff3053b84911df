//! `extern "C"` functions over opaque compiler and module handles.
//!
//! Handles are heap allocations owned by the caller from creation until the
//! matching release call. Every accessor accepts a null handle and returns
//! a default; compiling with a null compiler returns a null module. Panics
//! are caught before they reach the caller.

#![allow(non_camel_case_types)]

use ::glint_compiler::{Compiler, Module, ShaderKind, DEFAULT_ENTRY_POINT, DEFAULT_SOURCE_NAME};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

/// Opaque compiler handle.
pub struct glint_compiler {
    inner: Compiler,
}

/// Opaque result of one compilation.
pub struct glint_spv_module {
    module: Module,
    error_message: CString,
}

pub type glint_compiler_t = *mut glint_compiler;
pub type glint_spv_module_t = *mut glint_spv_module;

/// Shader stage selector, matching `enum glint_shader_kind` in `glint.h`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum glint_shader_kind {
    glint_glsl_vertex_shader = 0,
    glint_glsl_fragment_shader = 1,
}

impl glint_shader_kind {
    /// Reads a kind passed through C, where any `int` may arrive.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(glint_shader_kind::glint_glsl_vertex_shader),
            1 => Some(glint_shader_kind::glint_glsl_fragment_shader),
            _ => None,
        }
    }
}

impl From<glint_shader_kind> for ShaderKind {
    fn from(kind: glint_shader_kind) -> Self {
        match kind {
            glint_shader_kind::glint_glsl_vertex_shader => ShaderKind::Vertex,
            glint_shader_kind::glint_glsl_fragment_shader => ShaderKind::Fragment,
        }
    }
}

impl From<ShaderKind> for glint_shader_kind {
    fn from(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Vertex => glint_shader_kind::glint_glsl_vertex_shader,
            ShaderKind::Fragment => glint_shader_kind::glint_glsl_fragment_shader,
        }
    }
}

impl glint_spv_module {
    pub(crate) fn new(module: Module) -> Self {
        // Interior NULs would truncate the message for C readers.
        let text = module.error_message().replace('\0', " ");
        let error_message = CString::new(text).unwrap_or_default();
        Self {
            module,
            error_message,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }
}

/// Returned for the bytes of failed or null modules. Word-typed so the
/// pointer has the same alignment as real module data.
static EMPTY_WORDS: [u32; 1] = [0];

static EMPTY_MESSAGE: &[u8] = b"\0";

/// FFI: Creates a compiler with the default configuration.
///
/// Returns null if the compiler could not be initialized. Safe to call from
/// several threads at once.
#[no_mangle]
pub extern "C" fn glint_compiler_initialize() -> glint_compiler_t {
    let created = panic::catch_unwind(Compiler::new);
    match created {
        Ok(Ok(inner)) => Box::into_raw(Box::new(glint_compiler { inner })),
        Ok(Err(err)) => {
            log::error!("failed to initialize compiler: {err}");
            ptr::null_mut()
        }
        Err(_) => {
            log::error!("compiler initialization panicked");
            ptr::null_mut()
        }
    }
}

/// FFI: Releases a compiler. Modules it produced stay valid.
///
/// # Safety
/// `compiler` must be null or a handle returned by
/// [`glint_compiler_initialize`] that has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn glint_compiler_release(compiler: glint_compiler_t) {
    if !compiler.is_null() {
        drop(Box::from_raw(compiler));
    }
}

/// FFI: Compiles GLSL source into a new module.
///
/// `source_length` bytes of `source` are compiled; a negative length means
/// `source` is NUL-terminated. A null `entry_point` names the entry point
/// `main`. Returns null only when `compiler` is null; every other failure is
/// reported through the returned module.
///
/// # Safety
/// - `compiler` must be null or a live compiler handle. It may be used by
///   several threads at once.
/// - `source` must point to at least `source_length` readable bytes, or to a
///   NUL-terminated string when the length is negative. It may be null only
///   when the length is zero.
/// - `entry_point` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn glint_compile_into_spv(
    compiler: glint_compiler_t,
    source: *const c_char,
    source_length: c_int,
    shader_kind: c_int,
    entry_point: *const c_char,
) -> glint_spv_module_t {
    let Some(compiler) = compiler.as_ref() else {
        log::warn!("glint_compile_into_spv called with a null compiler");
        return ptr::null_mut();
    };

    let source = source_bytes(source, source_length);
    let entry_point = if entry_point.is_null() {
        Ok(DEFAULT_ENTRY_POINT)
    } else {
        CStr::from_ptr(entry_point).to_str()
    };

    let compiled = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(kind) = glint_shader_kind::from_raw(shader_kind) else {
            return Module::failure(DEFAULT_SOURCE_NAME, format!("unknown shader kind {shader_kind}"));
        };
        match entry_point {
            Ok(entry_point) => compiler.inner.compile_bytes(source, kind.into(), entry_point),
            Err(err) => Module::failure(DEFAULT_SOURCE_NAME, format!("entry point name is not valid UTF-8: {err}")),
        }
    }));

    let module = compiled
        .unwrap_or_else(|_| Module::failure(DEFAULT_SOURCE_NAME, "internal compiler error: compilation panicked"));
    Box::into_raw(Box::new(glint_spv_module::new(module)))
}

unsafe fn source_bytes<'a>(source: *const c_char, length: c_int) -> &'a [u8] {
    if source.is_null() {
        return &[];
    }
    match usize::try_from(length) {
        Ok(length) => slice::from_raw_parts(source.cast::<u8>(), length),
        Err(_) => CStr::from_ptr(source).to_bytes(),
    }
}

/// FFI: Releases a module.
///
/// # Safety
/// `module` must be null or a handle returned by [`glint_compile_into_spv`]
/// that has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn glint_module_release(module: glint_spv_module_t) {
    if !module.is_null() {
        drop(Box::from_raw(module));
    }
}

/// FFI: True if the module holds a SPIR-V binary. False for null.
///
/// # Safety
/// `module` must be null or a live module handle.
#[no_mangle]
pub unsafe extern "C" fn glint_module_get_success(module: glint_spv_module_t) -> bool {
    module
        .as_ref()
        .map_or(false, |module| module.module.success())
}

/// FFI: Length of the binary in bytes. 0 for failed and null modules.
///
/// # Safety
/// `module` must be null or a live module handle.
#[no_mangle]
pub unsafe extern "C" fn glint_module_get_length(module: glint_spv_module_t) -> usize {
    module.as_ref().map_or(0, |module| module.module.len())
}

/// FFI: Pointer to the binary, 4-byte aligned.
///
/// Never null; failed and null modules return a pointer to an empty buffer.
/// The pointer is valid until the module is released.
///
/// # Safety
/// `module` must be null or a live module handle.
#[no_mangle]
pub unsafe extern "C" fn glint_module_get_bytes(module: glint_spv_module_t) -> *const c_char {
    match module.as_ref() {
        Some(module) if !module.module.is_empty() => module.module.words().as_ptr().cast(),
        _ => EMPTY_WORDS.as_ptr().cast(),
    }
}

/// FFI: NUL-terminated diagnostic text. Empty on success and for null.
///
/// The pointer is valid until the module is released.
///
/// # Safety
/// `module` must be null or a live module handle.
#[no_mangle]
pub unsafe extern "C" fn glint_module_get_error_message(module: glint_spv_module_t) -> *const c_char {
    match module.as_ref() {
        Some(module) => module.error_message.as_ptr(),
        None => EMPTY_MESSAGE.as_ptr().cast(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_kind_from_raw() {
        assert_eq!(
            glint_shader_kind::from_raw(0),
            Some(glint_shader_kind::glint_glsl_vertex_shader)
        );
        assert_eq!(
            glint_shader_kind::from_raw(1),
            Some(glint_shader_kind::glint_glsl_fragment_shader)
        );
        assert_eq!(glint_shader_kind::from_raw(2), None);
        assert_eq!(glint_shader_kind::from_raw(-1), None);
    }

    #[test]
    fn test_shader_kind_conversions_agree() {
        for kind in ShaderKind::ALL {
            assert_eq!(ShaderKind::from(glint_shader_kind::from(kind)), kind);
        }
    }

    #[test]
    fn test_error_message_nuls_are_replaced() {
        let module = glint_spv_module::new(Module::failure("a\0b", "bad"));
        assert_eq!(
            module.error_message.to_str().unwrap(),
            "a b: error: bad\n"
        );
    }

    #[test]
    fn test_unknown_kind_fails_the_module() {
        let compiler = glint_compiler_initialize();
        let source = b"void main(){}";
        unsafe {
            let module = glint_compile_into_spv(
                compiler,
                source.as_ptr().cast(),
                source.len() as c_int,
                7,
                ptr::null(),
            );
            assert!(!module.is_null());
            assert!(!glint_module_get_success(module));
            let message = CStr::from_ptr(glint_module_get_error_message(module));
            assert!(message.to_str().unwrap().contains("unknown shader kind 7"));
            glint_module_release(module);
            glint_compiler_release(compiler);
        }
    }

    #[test]
    fn test_minimal_vertex_shader_compiles_through_the_c_abi() {
        let compiler = glint_compiler_initialize();
        assert!(!compiler.is_null());
        let source = b"void main(){}";
        unsafe {
            let module = glint_compile_into_spv(
                compiler,
                source.as_ptr().cast(),
                source.len() as c_int,
                glint_shader_kind::from(::glint_compiler::ShaderKind::Vertex) as c_int,
                ptr::null(),
            );
            assert!(glint_module_get_success(module));
            assert!(glint_module_get_length(module) >= 20);
            let first_word = *glint_module_get_bytes(module).cast::<u32>();
            assert_eq!(first_word, ::glint_compiler::SPIRV_MAGIC);
            glint_module_release(module);
            glint_compiler_release(compiler);
        }
    }
}
