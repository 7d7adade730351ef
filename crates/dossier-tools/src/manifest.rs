//! The closed tool manifest shown to the oracle

use serde_json::{json, Value};
use std::fmt;

/// The five probes the investigation can run. The set is closed: the
/// oracle selects from this manifest and nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    /// Keyword and structure census of a whole file (pdfid-class).
    StructureScan,
    /// Statistical object-type census of a whole file.
    ObjectStats,
    /// Dump one indirect object with its dictionary and references.
    ObjectInspect,
    /// Decode one object's stream into the session dump directory.
    StreamDump,
    /// Search the file for a keyword or name.
    KeywordSearch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::StructureScan,
        ToolKind::ObjectStats,
        ToolKind::ObjectInspect,
        ToolKind::StreamDump,
        ToolKind::KeywordSearch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::StructureScan => "structure_scan",
            ToolKind::ObjectStats => "object_stats",
            ToolKind::ObjectInspect => "object_inspect",
            ToolKind::StreamDump => "stream_dump",
            ToolKind::KeywordSearch => "keyword_search",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ToolKind::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Whether a successful run is expected to leave a decoded file in
    /// the dump directory.
    pub fn is_dump_class(&self) -> bool {
        matches!(self, ToolKind::StreamDump)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One manifest entry: what the oracle sees when selecting a tool.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub description: &'static str,
    pub arguments: Value,
}

impl ToolSpec {
    fn describe(&self) -> Value {
        json!({
            "name": self.kind.name(),
            "description": self.description,
            "arguments": self.arguments,
            "target": "an artifact id from the evidence locker, or null for the candidate file",
        })
    }
}

/// The closed set of tool specs, in manifest order.
pub struct ToolManifest {
    specs: Vec<ToolSpec>,
}

impl Default for ToolManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManifest {
    pub fn new() -> Self {
        let specs = vec![
            ToolSpec {
                kind: ToolKind::StructureScan,
                description: "Census of structural keywords across the target \
                              (/JS, /OpenAction, /Launch, object and stream counts). \
                              Cheap first look at what the file contains.",
                arguments: json!({ "type": "object", "properties": {} }),
            },
            ToolSpec {
                kind: ToolKind::ObjectStats,
                description: "Statistical census of indirect objects by type. \
                              Shows how many objects of each kind exist and where \
                              the unusual ones are.",
                arguments: json!({ "type": "object", "properties": {} }),
            },
            ToolSpec {
                kind: ToolKind::ObjectInspect,
                description: "Dump one indirect object: its dictionary, raw content, \
                              and the objects it references.",
                arguments: json!({
                    "type": "object",
                    "properties": {
                        "object_id": {
                            "type": "integer",
                            "description": "Number of the indirect object to inspect"
                        }
                    },
                    "required": ["object_id"]
                }),
            },
            ToolSpec {
                kind: ToolKind::StreamDump,
                description: "Decode one object's stream and write it to the session \
                              dump directory as a new evidence artifact. Set raw=true \
                              to skip filter decoding.",
                arguments: json!({
                    "type": "object",
                    "properties": {
                        "object_id": {
                            "type": "integer",
                            "description": "Number of the object whose stream to dump"
                        },
                        "raw": {
                            "type": "boolean",
                            "description": "Dump the stream without applying filters"
                        }
                    },
                    "required": ["object_id"]
                }),
            },
            ToolSpec {
                kind: ToolKind::KeywordSearch,
                description: "Search indirect objects for a keyword or name, e.g. \
                              /JavaScript or /EmbeddedFile.",
                arguments: json!({
                    "type": "object",
                    "properties": {
                        "keyword": {
                            "type": "string",
                            "description": "Keyword to search for"
                        }
                    },
                    "required": ["keyword"]
                }),
            },
        ];
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.kind.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|s| s.kind.name()).collect()
    }

    /// Renders the manifest as the JSON array embedded in
    /// tool-selection snapshots.
    pub fn for_oracle(&self) -> Value {
        Value::Array(self.specs.iter().map(|s| s.describe()).collect())
    }

    /// Checks a named tool call against the manifest: the tool must be
    /// listed and the arguments must match its shape. Returns the
    /// resolved kind or a rejection message.
    pub fn validate(&self, tool: &str, arguments: &Value) -> Result<ToolKind, String> {
        let spec = self
            .get(tool)
            .ok_or_else(|| format!("tool '{}' is not in the manifest", tool))?;
        validate_arguments(spec.kind, arguments)?;
        Ok(spec.kind)
    }
}

fn validate_arguments(kind: ToolKind, arguments: &Value) -> Result<(), String> {
    if !(arguments.is_object() || arguments.is_null()) {
        return Err(format!("{} arguments must be a JSON object", kind));
    }
    match kind {
        ToolKind::StructureScan | ToolKind::ObjectStats => Ok(()),
        ToolKind::ObjectInspect | ToolKind::StreamDump => {
            require_object_id(kind, arguments).map(|_| ())
        }
        ToolKind::KeywordSearch => {
            let keyword = arguments
                .get("keyword")
                .and_then(Value::as_str)
                .unwrap_or("");
            if keyword.trim().is_empty() {
                Err(format!("{} requires a non-empty 'keyword'", kind))
            } else {
                Ok(())
            }
        }
    }
}

/// Extracts the mandatory `object_id` argument.
pub fn require_object_id(kind: ToolKind, arguments: &Value) -> Result<u32, String> {
    arguments
        .get("object_id")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("{} requires an integer 'object_id'", kind))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_resolves_by_name() {
        let manifest = ToolManifest::new();
        for kind in ToolKind::ALL {
            assert!(manifest.get(kind.name()).is_some(), "missing {}", kind);
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert!(manifest.get("rm_rf").is_none());
    }

    #[test]
    fn unlisted_tool_is_rejected() {
        let manifest = ToolManifest::new();
        let err = manifest.validate("shellcode_runner", &json!({})).unwrap_err();
        assert!(err.contains("not in the manifest"));
    }

    #[test]
    fn object_tools_require_object_id() {
        let manifest = ToolManifest::new();
        assert!(manifest.validate("object_inspect", &json!({})).is_err());
        assert!(manifest
            .validate("object_inspect", &json!({ "object_id": "seven" }))
            .is_err());
        assert_eq!(
            manifest
                .validate("stream_dump", &json!({ "object_id": 7 }))
                .unwrap(),
            ToolKind::StreamDump
        );
    }

    #[test]
    fn keyword_search_requires_keyword() {
        let manifest = ToolManifest::new();
        assert!(manifest.validate("keyword_search", &json!({})).is_err());
        assert!(manifest
            .validate("keyword_search", &json!({ "keyword": "  " }))
            .is_err());
        assert!(manifest
            .validate("keyword_search", &json!({ "keyword": "/JS" }))
            .is_ok());
    }

    #[test]
    fn census_tools_accept_empty_arguments() {
        let manifest = ToolManifest::new();
        assert!(manifest.validate("structure_scan", &Value::Null).is_ok());
        assert!(manifest.validate("object_stats", &json!({})).is_ok());
    }

    #[test]
    fn oracle_rendering_lists_all_tools() {
        let manifest = ToolManifest::new();
        let rendered = manifest.for_oracle();
        let entries = rendered.as_array().unwrap();
        assert_eq!(entries.len(), 5);
        for entry in entries {
            assert!(entry["name"].is_string());
            assert!(entry["arguments"].is_object());
        }
    }
}
