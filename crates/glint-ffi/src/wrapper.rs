//! Owning wrappers over the raw C handles.
//!
//! [`Compiler`] and [`SpvModule`] each own at most one handle and release it
//! on drop. Neither is `Clone`. The default value of each holds no handle and
//! reports itself invalid, so `std::mem::take` moves a handle out and leaves
//! an invalid wrapper behind.

use crate::ffi::{
    glint_compile_into_spv, glint_compiler_initialize, glint_compiler_release, glint_compiler_t,
    glint_module_get_bytes, glint_module_get_error_message, glint_module_get_length,
    glint_module_get_success, glint_module_release, glint_shader_kind, glint_spv_module,
    glint_spv_module_t,
};
use ::glint_compiler::{Module, ShaderKind, DEFAULT_ENTRY_POINT, DEFAULT_SOURCE_NAME};
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_int;
use std::ptr;
use std::slice;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WrapperError {
    #[error("compiler initialization failed")]
    InitializationFailed,

    #[error("source is too long for the C interface ({0} bytes)")]
    SourceTooLong(usize),
}

/// Owns a compiler handle.
pub struct Compiler {
    raw: glint_compiler_t,
}

// The handle is only read after creation, and compilation through a shared
// handle is supported.
unsafe impl Send for Compiler {}
unsafe impl Sync for Compiler {}

impl Compiler {
    /// Initializes a compiler. The result is invalid if initialization failed.
    pub fn new() -> Self {
        Self {
            raw: glint_compiler_initialize(),
        }
    }

    pub fn try_new() -> Result<Self, WrapperError> {
        let compiler = Self::new();
        if compiler.is_valid() {
            Ok(compiler)
        } else {
            Err(WrapperError::InitializationFailed)
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.raw.is_null()
    }

    /// The underlying handle, still owned by `self`.
    pub fn raw(&self) -> glint_compiler_t {
        self.raw
    }

    /// Compiles `source` with entry point `main`.
    ///
    /// An invalid compiler yields an invalid module.
    pub fn compile_glsl_to_spv(&self, source: &str, kind: ShaderKind) -> SpvModule {
        self.compile_glsl_to_spv_with_entry(source, kind, DEFAULT_ENTRY_POINT)
    }

    pub fn compile_glsl_to_spv_with_entry(
        &self,
        source: &str,
        kind: ShaderKind,
        entry_point: &str,
    ) -> SpvModule {
        let Ok(entry_point) = CString::new(entry_point) else {
            return self.rejected("entry point name contains a NUL byte");
        };
        let Ok(length) = c_int::try_from(source.len()) else {
            return self.rejected(&WrapperError::SourceTooLong(source.len()).to_string());
        };

        unsafe {
            SpvModule::from_raw(glint_compile_into_spv(
                self.raw,
                source.as_ptr().cast(),
                length,
                glint_shader_kind::from(kind) as c_int,
                entry_point.as_ptr(),
            ))
        }
    }

    /// Compiles NUL-terminated `source`; identical in result to the `&str` form.
    pub fn compile_glsl_to_spv_cstr(&self, source: &CStr, kind: ShaderKind) -> SpvModule {
        unsafe {
            SpvModule::from_raw(glint_compile_into_spv(
                self.raw,
                source.as_ptr(),
                -1,
                glint_shader_kind::from(kind) as c_int,
                ptr::null(),
            ))
        }
    }

    /// A failed module for input the C interface cannot carry.
    fn rejected(&self, reason: &str) -> SpvModule {
        if !self.is_valid() {
            return SpvModule::default();
        }
        let module = glint_spv_module::new(Module::failure(DEFAULT_SOURCE_NAME, reason));
        SpvModule {
            raw: Box::into_raw(Box::new(module)),
        }
    }
}

impl Default for Compiler {
    /// An invalid compiler holding no handle.
    fn default() -> Self {
        Self {
            raw: ptr::null_mut(),
        }
    }
}

impl Drop for Compiler {
    fn drop(&mut self) {
        unsafe { glint_compiler_release(self.raw) }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler").field("valid", &self.is_valid()).finish()
    }
}

/// Owns a module handle.
///
/// An invalid module behaves like a failed one with no message.
pub struct SpvModule {
    raw: glint_spv_module_t,
}

// Modules never change after creation.
unsafe impl Send for SpvModule {}
unsafe impl Sync for SpvModule {}

impl SpvModule {
    /// Takes ownership of `raw`.
    ///
    /// # Safety
    /// `raw` must be null or a live module handle not owned by anything else.
    pub unsafe fn from_raw(raw: glint_spv_module_t) -> Self {
        Self { raw }
    }

    /// Gives up ownership of the handle; the caller must release it.
    pub fn into_raw(mut self) -> glint_spv_module_t {
        std::mem::replace(&mut self.raw, ptr::null_mut())
    }

    pub fn is_valid(&self) -> bool {
        !self.raw.is_null()
    }

    pub fn success(&self) -> bool {
        unsafe { glint_module_get_success(self.raw) }
    }

    /// Length of the binary in bytes.
    pub fn len(&self) -> usize {
        unsafe { glint_module_get_length(self.raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The binary as bytes.
    pub fn data(&self) -> &[u8] {
        let len = self.len();
        if len == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(glint_module_get_bytes(self.raw).cast::<u8>(), len) }
    }

    /// The binary as SPIR-V words.
    pub fn words(&self) -> &[u32] {
        let len = self.len() / std::mem::size_of::<u32>();
        if len == 0 {
            return &[];
        }
        // Module bytes are word-aligned.
        unsafe { slice::from_raw_parts(glint_module_get_bytes(self.raw).cast::<u32>(), len) }
    }

    /// Diagnostic text; empty on success and for invalid modules.
    pub fn error_message(&self) -> &str {
        let message = unsafe { CStr::from_ptr(glint_module_get_error_message(self.raw)) };
        message.to_str().unwrap_or_default()
    }
}

impl Default for SpvModule {
    /// An invalid module holding no handle.
    fn default() -> Self {
        Self {
            raw: ptr::null_mut(),
        }
    }
}

impl Drop for SpvModule {
    fn drop(&mut self) {
        unsafe { glint_module_release(self.raw) }
    }
}

impl fmt::Debug for SpvModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpvModule")
            .field("valid", &self.is_valid())
            .field("success", &self.success())
            .field("len", &self.len())
            .finish()
    }
}
