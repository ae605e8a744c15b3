use super::scripted::ScriptedTool;
use super::*;
use crate::error::{PipelineError, StageId};
use std::sync::Arc;

fn sysroot_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut dir = tar::Header::new_ustar();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_size(0);
    builder.append_data(&mut dir, "lib", std::io::empty()).unwrap();
    let mut file = tar::Header::new_ustar();
    file.set_entry_type(tar::EntryType::Regular);
    file.set_size(4);
    builder.append_data(&mut file, "lib/crt1.o", &b"crt1"[..]).unwrap();
    builder.into_inner().unwrap()
}

#[test]
fn test_exit_status() {
    assert!(ExitStatus::SUCCESS.success());
    assert!(!ExitStatus(1).success());
    assert_eq!(ExitStatus(42).code(), 42);
    assert_eq!(ExitStatus(42).to_string(), "42");
}

#[tokio::test]
async fn test_stage_writes_inputs_and_reads_output() {
    let tool = ScriptedTool::new("upper", |fs, args| {
        assert_eq!(args, ["-o", "out.txt"]);
        let input = fs.read_file("in.txt").unwrap();
        fs.write_file("out.txt", &input.to_ascii_uppercase()).unwrap();
        0
    });

    let output = Stage::new(StageId::Compile, tool.clone())
        .input("in.txt", b"hello".to_vec())
        .args(["-o", "out.txt"])
        .output("out.txt")
        .run()
        .await
        .unwrap();

    assert_eq!(output, b"HELLO");
    assert_eq!(tool.loads(), 1);
}

#[tokio::test]
async fn test_stage_extracts_sysroot_before_invoke() {
    let tool = ScriptedTool::new("ld", |fs, _| {
        if fs.read_file("/lib/crt1.o").ok().as_deref() != Some(b"crt1".as_slice()) {
            return 1;
        }
        fs.write_file("main.wasm", b"\0asm").unwrap();
        0
    });

    let output = Stage::new(StageId::Link, tool)
        .input("main.o", b"obj".to_vec())
        .sysroot(Arc::new(sysroot_archive()))
        .output("main.wasm")
        .run()
        .await
        .unwrap();

    assert_eq!(output, b"\0asm");
}

#[tokio::test]
async fn test_stage_nonzero_exit_fails() {
    let tool = ScriptedTool::new("cc", |fs, _| {
        fs.write_file("main.o", b"half written").unwrap();
        1
    });

    let err = Stage::new(StageId::Compile, tool)
        .output("main.o")
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage(), StageId::Compile);
    match err {
        PipelineError::ToolInvocation {
            source: ToolError::NonZeroExit { status, diagnostics, .. },
            ..
        } => {
            assert_eq!(status, 1);
            assert_eq!(diagnostics, "scripted failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stage_missing_output_fails() {
    let tool = ScriptedTool::new("cc", |_, _| 0);

    let err = Stage::new(StageId::Compile, tool)
        .output("main.o")
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ToolInvocation {
            stage: StageId::Compile,
            source: ToolError::MissingOutput { .. }
        }
    ));
}

#[tokio::test]
async fn test_stage_bad_sysroot_is_archive_error() {
    let mut builder = tar::Builder::new(Vec::new());
    let mut link = tar::Header::new_ustar();
    link.set_entry_type(tar::EntryType::Symlink);
    link.set_size(0);
    link.set_link_name("x").unwrap();
    builder.append_data(&mut link, "lib", std::io::empty()).unwrap();
    let archive = builder.into_inner().unwrap();

    let tool = ScriptedTool::new("ld", |_, _| panic!("must not be invoked"));
    let err = Stage::new(StageId::Link, tool)
        .sysroot(Arc::new(archive))
        .output("main.wasm")
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Archive {
            stage: StageId::ExtractSysroot,
            ..
        }
    ));
}

#[tokio::test]
async fn test_each_run_gets_fresh_instance() {
    let tool = ScriptedTool::new("counter", |fs, _| {
        // a leftover file from a previous run would make this fail
        if fs.exists("out.txt") {
            return 7;
        }
        fs.write_file("out.txt", b"once").unwrap();
        0
    });
    let stage = Stage::new(StageId::Compile, tool.clone()).output("out.txt");

    assert_eq!(stage.run().await.unwrap(), b"once");
    assert_eq!(stage.run().await.unwrap(), b"once");
    assert_eq!(tool.loads(), 2);
}

const EXIT_WITH_ARGC: &str = r#"
(module
  (import "wasi_snapshot_preview1" "args_sizes_get"
    (func $args_sizes_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") 1)
  (func (export "_start")
    (drop (call $args_sizes_get (i32.const 0) (i32.const 4)))
    (call $proc_exit (i32.load (i32.const 0)))))
"#;

#[tokio::test(flavor = "multi_thread")]
async fn test_wasi_tool_reports_exit_status() {
    let tool = WasiTool::from_bytes("argc", wat::parse_str(EXIT_WITH_ARGC).unwrap());
    let mut instance = tool.load().await.unwrap();

    let status = instance
        .invoke(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(status, ExitStatus(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wasi_tool_trap() {
    let wat = r#"(module (memory (export "memory") 1) (func (export "_start") unreachable))"#;
    let tool = WasiTool::from_bytes("boom", wat::parse_str(wat).unwrap());
    let mut instance = tool.load().await.unwrap();

    let result = instance.invoke(&[]).await;
    assert!(matches!(result, Err(ToolError::Trapped { .. })));
}

#[tokio::test]
async fn test_wasi_tool_invalid_module_fails_to_load() {
    let tool = WasiTool::from_bytes("junk", b"not wasm".to_vec());
    assert!(matches!(tool.load().await, Err(ToolError::Load { .. })));
}

#[tokio::test]
async fn test_wasi_tool_missing_path_fails_to_load() {
    let tool = WasiTool::from_path("gone", "/nonexistent/tool.wasm");
    assert!(matches!(tool.load().await, Err(ToolError::Load { .. })));
}

#[tokio::test]
async fn test_wasi_tool_image_is_unpacked_on_load() {
    let tool = WasiTool::from_bytes("argc", wat::parse_str(EXIT_WITH_ARGC).unwrap())
        .image(sysroot_archive());

    let instance = tool.load().await.unwrap();
    assert!(instance.is_dir("/lib"));
    assert_eq!(instance.read_file("lib/crt1.o").unwrap(), b"crt1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wasi_tool_files_survive_invoke() {
    let tool = WasiTool::from_bytes("argc", wat::parse_str(EXIT_WITH_ARGC).unwrap());
    let mut instance = tool.load().await.unwrap();
    instance.mkdir("work").unwrap();
    instance.write_file("work/main.o", b"object").unwrap();

    instance.invoke(&[]).await.unwrap();

    assert_eq!(instance.read_file("work/main.o").unwrap(), b"object");
}
