//! WASI guest tools generated from WAT, standing in for clang/llc/lld.
//!
//! A writer tool checks that each required file exists in its preopened
//! root (exit 2 if one is missing), then writes a fixed payload to its
//! output file (exit 3 if that fails).

#![allow(dead_code)]

use runbox::{PipelineConfig, ToolConfig, Variant};
use std::path::Path;

pub const HELLO: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 8) "hi\n")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 8))
    (i32.store (i32.const 4) (i32.const 3))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 20)))))
"#;

pub const PARTIAL_THEN_EXIT: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") 1)
  (data (i32.const 8) "partial\n")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 8))
    (i32.store (i32.const 4) (i32.const 8))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 20)))
    (call $proc_exit (i32.const 3))))
"#;

pub const TRAPS: &str = r#"(module (memory (export "memory") 1) (func (export "_start") unreachable))"#;

const PATH_OPEN_READ: i64 = 2;
const PATH_OPEN_WRITE: i64 = 64;
const OFLAGS_CREAT_TRUNC: i32 = 9;
const DATA_START: usize = 64;

fn escape(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{:02x}", b)).collect()
}

pub fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).unwrap()
}

/// Tool that writes `payload` to `output` once every path in `required` exists
pub fn writer_tool(required: &[&str], output: &str, payload: &[u8]) -> Vec<u8> {
    let mut data = String::new();
    let mut body = String::new();
    let mut offset = DATA_START;

    let mut place = |bytes: &[u8], data: &mut String| {
        let at = offset;
        data.push_str(&format!("  (data (i32.const {}) \"{}\")\n", at, escape(bytes)));
        offset += bytes.len();
        at
    };

    for path in required {
        let at = place(path.as_bytes(), &mut data);
        body.push_str(&format!(
            "    (if (i32.ne (call $path_open (i32.const 3) (i32.const 0) (i32.const {}) (i32.const {}) \
             (i32.const 0) (i64.const {}) (i64.const 0) (i32.const 0) (i32.const 0)) (i32.const 0))\n\
             \x20     (then (call $proc_exit (i32.const 2))))\n",
            at,
            path.len(),
            PATH_OPEN_READ
        ));
    }

    let output_at = place(output.as_bytes(), &mut data);
    let payload_at = place(payload, &mut data);
    body.push_str(&format!(
        "    (if (i32.ne (call $path_open (i32.const 3) (i32.const 0) (i32.const {}) (i32.const {}) \
         (i32.const {}) (i64.const {}) (i64.const 0) (i32.const 0) (i32.const 0)) (i32.const 0))\n\
         \x20     (then (call $proc_exit (i32.const 3))))\n",
        output_at,
        output.len(),
        OFLAGS_CREAT_TRUNC,
        PATH_OPEN_WRITE
    ));
    body.push_str(&format!(
        "    (i32.store (i32.const 8) (i32.const {}))\n\
         \x20   (i32.store (i32.const 12) (i32.const {}))\n\
         \x20   (drop (call $fd_write (i32.load (i32.const 0)) (i32.const 8) (i32.const 1) (i32.const 16)))\n",
        payload_at,
        payload.len()
    ));

    let pages = offset / 65536 + 1;
    wasm(&format!(
        r#"(module
  (import "wasi_snapshot_preview1" "path_open"
    (func $path_open (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") {pages})
{data}  (func (export "_start")
{body}  ))"#
    ))
}

/// Tool that prints `message` to stderr and exits with `status`
pub fn failing_tool(message: &str, status: i32) -> Vec<u8> {
    wasm(&format!(
        r#"(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") 1)
  (data (i32.const {at}) "{escaped}")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const {at}))
    (i32.store (i32.const 4) (i32.const {len}))
    (drop (call $fd_write (i32.const 2) (i32.const 0) (i32.const 1) (i32.const 16)))
    (call $proc_exit (i32.const {status}))))"#,
        at = DATA_START,
        escaped = escape(message.as_bytes()),
        len = message.len(),
    ))
}

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

pub fn archive(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_ustar();
        match entry {
            Entry::Dir(path) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            }
            Entry::File(path, contents) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(contents.len() as u64);
                builder.append_data(&mut header, path, *contents).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub fn sysroot() -> Vec<u8> {
    archive(&[
        Entry::Dir("lib"),
        Entry::Dir("lib/wasm32-wasi"),
        Entry::File("lib/wasm32-wasi/crt1.o", b"crt1"),
        Entry::File("lib/wasm32-wasi/libc.a", b"!<arch>\n"),
    ])
}

/// Write `module` into `dir` and point `tool` at it
pub fn install(dir: &Path, mut tool: ToolConfig, module: &[u8]) -> ToolConfig {
    let path = dir.join(format!("{}.wasm", tool.program_name));
    std::fs::write(&path, module).unwrap();
    tool.module = path;
    tool
}

/// IR pipeline whose linker emits `program` and whose sysroot archive is `sysroot`
pub fn ir_config(dir: &Path, sysroot: &[u8], program: &[u8]) -> PipelineConfig {
    std::fs::write(dir.join("sysroot.tar"), sysroot).unwrap();

    let mut config = PipelineConfig::new(Variant::Ir);
    config.base_url = dir.to_string_lossy().into_owned();
    config.compiler = Some(install(
        dir,
        ToolConfig::llc(),
        &writer_tool(&["main.ll"], "main.o", b"\0asm object"),
    ));
    config.linker = Some(install(
        dir,
        ToolConfig::lld(),
        &writer_tool(&["main.o", "lib/wasm32-wasi/crt1.o"], "main.wasm", program),
    ));
    config
}
