use glint_compiler::ShaderKind;
use glint_ffi::{Compiler, SpvModule};
use std::ffi::CString;
use std::mem;
use std::sync::Arc;
use std::thread;

const SPIRV_MAGIC: u32 = 0x0723_0203;
const MINIMAL_SHADER: &str = "void main(){}";

fn compiles_to_valid_spv(compiler: &Compiler, source: &str, kind: ShaderKind) -> bool {
    let module = compiler.compile_glsl_to_spv(source, kind);
    module.is_valid()
        && module.success()
        && module.len() >= 20
        && module.words().first() == Some(&SPIRV_MAGIC)
}

#[test]
fn test_multiple_calls() {
    let compiler = Compiler::new();
    assert!(compiler.is_valid());
    for _ in 0..3 {
        assert!(compiles_to_valid_spv(&compiler, MINIMAL_SHADER, ShaderKind::Vertex));
    }
}

#[test]
fn test_multiple_threads_initializing() {
    let compilers: Vec<Compiler> = thread::scope(|scope| {
        let handles: Vec<_> = (0..10).map(|_| scope.spawn(Compiler::new)).collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for compiler in &compilers {
        assert!(compiler.is_valid());
        assert!(compiles_to_valid_spv(compiler, "", ShaderKind::Fragment));
    }
}

#[test]
fn test_compiler_moves() {
    let mut first = Compiler::new();
    assert!(first.is_valid());

    let second = mem::take(&mut first);
    assert!(!first.is_valid());
    assert!(second.is_valid());
    assert!(compiles_to_valid_spv(&second, MINIMAL_SHADER, ShaderKind::Vertex));
}

#[test]
fn test_empty_string() {
    let compiler = Compiler::new();
    assert!(compiles_to_valid_spv(&compiler, "", ShaderKind::Vertex));
    assert!(compiles_to_valid_spv(&compiler, "", ShaderKind::Fragment));
}

#[test]
fn test_module_moves() {
    let compiler = Compiler::new();
    let mut first = compiler.compile_glsl_to_spv(MINIMAL_SHADER, ShaderKind::Vertex);
    assert!(first.is_valid());

    let second: SpvModule = mem::take(&mut first);
    assert!(!first.is_valid());
    assert!(second.is_valid());
    assert!(second.success());
}

#[test]
fn test_garbage_string() {
    let compiler = Compiler::new();
    assert!(!compiles_to_valid_spv(&compiler, "jfalkds", ShaderKind::Vertex));
    assert!(!compiles_to_valid_spv(&compiler, "jfalkds", ShaderKind::Fragment));
}

#[test]
fn test_minimal_shader() {
    let compiler = Compiler::new();
    assert!(compiles_to_valid_spv(&compiler, MINIMAL_SHADER, ShaderKind::Vertex));
    assert!(compiles_to_valid_spv(&compiler, MINIMAL_SHADER, ShaderKind::Fragment));
}

#[test]
fn test_str_and_cstr_forms() {
    let compiler = Compiler::new();
    let source = CString::new(MINIMAL_SHADER).unwrap();

    let from_str = compiler.compile_glsl_to_spv(MINIMAL_SHADER, ShaderKind::Fragment);
    let from_cstr = compiler.compile_glsl_to_spv_cstr(&source, ShaderKind::Fragment);

    assert!(from_str.success());
    assert!(from_cstr.success());
    assert_eq!(from_str.len(), from_cstr.len());
    assert_eq!(from_str.data(), from_cstr.data());
}

#[test]
fn test_errors_reported() {
    let compiler = Compiler::new();
    let module = compiler.compile_glsl_to_spv("int f(){return wrongname;}", ShaderKind::Vertex);
    assert!(module.is_valid());
    assert!(!module.success());
    assert!(module.error_message().contains("wrongname"));
}

#[test]
fn test_custom_entry_point() {
    let compiler = Compiler::new();
    let module = compiler.compile_glsl_to_spv_with_entry(MINIMAL_SHADER, ShaderKind::Vertex, "vs_main");
    assert!(module.success(), "{}", module.error_message());
}

#[test]
fn test_multiple_threads_calling() {
    let compiler = Arc::new(Compiler::new());
    assert!(compiler.is_valid());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let compiler = Arc::clone(&compiler);
            thread::spawn(move || compiles_to_valid_spv(&compiler, MINIMAL_SHADER, ShaderKind::Vertex))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_accessors_on_null_module() {
    let module = SpvModule::default();
    assert!(!module.is_valid());
    assert!(!module.success());
    assert_eq!(module.len(), 0);
    assert!(module.data().is_empty());
    assert_eq!(module.error_message(), "");
}

#[test]
fn test_module_is_readable_from_several_threads() {
    let compiler = Compiler::new();
    let module = compiler.compile_glsl_to_spv(MINIMAL_SHADER, ShaderKind::Fragment);
    drop(compiler);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert!(module.success());
                assert_eq!(module.words()[0], SPIRV_MAGIC);
            });
        }
    });
}
