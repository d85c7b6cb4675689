#![allow(dead_code, unused_imports)]

pub use sitepipe_test_utils::builders;
pub use sitepipe_test_utils::fake_executor;
pub use sitepipe_test_utils::{init_tracing, with_timeout};

use sitepipe::fs::mock::MockFileSystem;

/// A mock filesystem populated with `(path, contents)` pairs.
pub fn mock_fs(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    for (path, contents) in files {
        fs.add_file(path, contents.as_bytes());
    }
    fs
}

/// Contents of `path` in `fs` as a string, panicking if it is missing.
pub fn read(fs: &MockFileSystem, path: &str) -> String {
    let bytes = fs
        .contents(path)
        .unwrap_or_else(|| panic!("expected file {path} to exist"));
    String::from_utf8(bytes).expect("utf-8 contents")
}
