// ABOUTME: Temporary MySQL option file carrying connection credentials
// ABOUTME: Keeps passwords off the command line and out of the process list

use crate::config::Endpoint;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A `[client]` option file passed with `--defaults-extra-file`
///
/// The file is created with owner-only permissions and removed when this
/// value is dropped.
pub struct ClientOptionsFile {
    file: NamedTempFile,
}

impl ClientOptionsFile {
    pub fn new(endpoint: &Endpoint) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("amxmigrate-")
            .suffix(".cnf")
            .tempfile()?;

        file.write_all(render(endpoint).as_bytes())?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The `--defaults-extra-file=...` argument; must be the first client argument
    pub fn arg(&self) -> String {
        format!("--defaults-extra-file={}", self.path().display())
    }
}

fn render(endpoint: &Endpoint) -> String {
    let mut contents = String::from("[client]\n");
    contents.push_str(&format!("host=\"{}\"\n", escape(&endpoint.host)));
    contents.push_str(&format!("port={}\n", endpoint.port));
    contents.push_str(&format!("user=\"{}\"\n", escape(&endpoint.user)));
    if !endpoint.password.is_empty() {
        contents.push_str(&format!("password=\"{}\"\n", escape(&endpoint.password)));
    }
    contents
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
