//! Test helpers for writing element files and running commands.

use super::*;
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Two nodes, a way over them and a relation around the way.
pub(super) const TOWN_ELEMENTS: &str = r#"[
    {"type": "node", "id": 1, "tags": {"amenity": "cafe", "name": "Kaffee"},
     "location": {"x": 10.0, "y": 10.0}},
    {"type": "node", "id": 2, "location": {"x": 12.0, "y": 11.0}},
    {"type": "way", "id": 10, "tags": {"highway": "footway"},
     "members": [{"type": "node", "ref": 1}, {"type": "node", "ref": 2}]},
    {"type": "relation", "id": 20, "tags": {"route": "hiking"},
     "members": [{"type": "way", "ref": 10, "role": "outer"}]}
]"#;

/// A temporary directory holding an element file and a database path.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub(super) fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            path: self.root.join("db/index.sqlite"),
            index: IndexConfig::default(),
        }
    }

    pub(super) fn load_town(&self) -> String {
        let config = load::LoadConfig {
            input: self.write("town.json", TOWN_ELEMENTS),
            database: self.database(),
        };
        capture(|writer| load::run_load(&config, writer)).expect("load town")
    }

    pub(super) fn query(&self, query: xapi_index_core::XapiQuery) -> Vec<String> {
        let config = query::QueryConfig {
            query,
            database: self.database(),
        };
        capture(|writer| query::run_query(&config, writer))
            .expect("query")
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

/// Run a command against an in-memory writer and return what it printed.
pub(super) fn capture(
    command: impl FnOnce(&mut dyn std::io::Write) -> Result<(), CliError>,
) -> Result<String, CliError> {
    let mut output = Vec::new();
    command(&mut output)?;
    Ok(String::from_utf8(output).expect("utf-8 output"))
}
