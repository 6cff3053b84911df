use crate::error::ShaderDiagnostic;

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Size of the SPIR-V module header in words.
pub const SPIRV_HEADER_WORDS: usize = 5;

/// The result of one compilation.
///
/// A module holds either a SPIR-V binary or the diagnostics explaining why
/// there is none. It owns a copy of everything it reports and never changes
/// after construction, so it stays valid after the compiler that produced it
/// is dropped and may be read from several threads at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    words: Box<[u32]>,
    diagnostics: Vec<ShaderDiagnostic>,
    error_message: String,
}

impl Module {
    /// A successful module holding `words`.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self {
            words: words.into_boxed_slice(),
            diagnostics: Vec::new(),
            error_message: String::new(),
        }
    }

    /// A failed module.
    ///
    /// An empty diagnostic list is replaced by a generic diagnostic so a
    /// failed module always carries a message.
    pub fn from_diagnostics(source_name: &str, mut diagnostics: Vec<ShaderDiagnostic>) -> Self {
        if diagnostics.is_empty() {
            diagnostics.push(ShaderDiagnostic::new(
                source_name,
                None,
                "compilation failed without a diagnostic",
            ));
        }

        let error_message = diagnostics
            .iter()
            .map(|diagnostic| format!("{diagnostic}\n"))
            .collect();

        Self {
            words: Box::default(),
            diagnostics,
            error_message,
        }
    }

    /// A failed module with a single unlocated diagnostic.
    pub fn failure(source_name: &str, message: impl Into<String>) -> Self {
        Self::from_diagnostics(source_name, vec![ShaderDiagnostic::new(source_name, None, message)])
    }

    /// True if compilation produced a binary.
    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Length of the binary in bytes (0 on failure).
    pub fn len(&self) -> usize {
        self.words.len() * std::mem::size_of::<u32>()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The binary as SPIR-V words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The binary as bytes in native word order.
    ///
    /// The slice starts on a 4-byte boundary.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words[..])
    }

    /// Diagnostic text, one `source:line: error: message` line per problem.
    /// Empty on success.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn diagnostics(&self) -> &[ShaderDiagnostic] {
        &self.diagnostics
    }

    /// Converts into the binary words, or the diagnostics on failure.
    pub fn into_result(self) -> Result<Vec<u32>, Vec<ShaderDiagnostic>> {
        if self.diagnostics.is_empty() {
            Ok(self.words.into_vec())
        } else {
            Err(self.diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_module_accessors() {
        let module = Module::from_words(vec![SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        assert!(module.success());
        assert_eq!(module.len(), 20);
        assert_eq!(module.as_bytes().len(), 20);
        assert_eq!(module.as_bytes().as_ptr() as usize % 4, 0);
        assert_eq!(module.words()[0], SPIRV_MAGIC);
        assert_eq!(module.error_message(), "");
    }

    #[test]
    fn test_failed_module_carries_message() {
        let module = Module::failure("main.vert", "boom");
        assert!(!module.success());
        assert_eq!(module.len(), 0);
        assert!(module.as_bytes().is_empty());
        assert_eq!(module.error_message(), "main.vert: error: boom\n");
    }

    #[test]
    fn test_failed_module_never_has_empty_message() {
        let module = Module::from_diagnostics("shader", Vec::new());
        assert!(!module.success());
        assert!(!module.error_message().is_empty());
        assert_eq!(module.diagnostics().len(), 1);
    }

    #[test]
    fn test_into_result() {
        let ok = Module::from_words(vec![SPIRV_MAGIC]).into_result();
        assert_eq!(ok, Ok(vec![SPIRV_MAGIC]));

        let err = Module::failure("s", "bad").into_result().unwrap_err();
        assert_eq!(err[0].message, "bad");
    }
}
