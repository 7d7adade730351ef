//! Evidence locker: append-only ledger of artifacts, indicators, and
//! attack-chain links. Nothing in here is ever updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::{ArtifactId, AttackLink, Indicator};

/// What a locker artifact holds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Analyzer report text (triage outputs).
    Report,
    /// An indirect object dump.
    Object,
    /// A decoded stream.
    Stream,
    /// A decoded/deobfuscated payload.
    Payload,
    Url,
    Text,
}

/// Where an artifact holds its content. The two storage forms are
/// mutually exclusive by construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum ArtifactBody {
    /// Bounded content stored in the locker itself.
    Inline { content: String },
    /// Content written to disk by a dump-class tool.
    FileRef { path: PathBuf },
}

impl ArtifactBody {
    fn hash_input(&self) -> &[u8] {
        match self {
            Self::Inline { content } => content.as_bytes(),
            Self::FileRef { path } => path.as_os_str().as_encoded_bytes(),
        }
    }
}

/// Which tool, at which interrogation step, produced an artifact.
/// Step 0 is triage seeding.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactOrigin {
    pub tool: String,
    pub step: u32,
}

impl ArtifactOrigin {
    pub fn new(tool: impl Into<String>, step: u32) -> Self {
        Self {
            tool: tool.into(),
            step,
        }
    }
}

/// A piece of extracted or derived content with provenance. Immutable
/// after creation; the locker hands out references only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub origin: ArtifactOrigin,
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub body: ArtifactBody,
    /// Parent artifact this was derived from, when any.
    pub parent: Option<ArtifactId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvidenceLocker {
    /// Insertion-ordered; ids are unique, never reused, never overwritten.
    pub artifacts: Vec<Artifact>,
    /// Unordered set semantics: deduplicated on (value, source).
    pub indicators: Vec<Indicator>,
    pub attack_chain: Vec<AttackLink>,
    /// Keyword census from the triage structure scan, e.g. "/JS" -> 2.
    pub structural_summary: BTreeMap<String, u64>,
}

impl EvidenceLocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an artifact and return its minted id.
    ///
    /// Ids are hash-derived from origin + body; a collision is detected
    /// and disambiguated with a numeric suffix rather than overwriting.
    pub fn add_artifact(
        &mut self,
        body: ArtifactBody,
        origin: ArtifactOrigin,
        kind: ArtifactKind,
        parent: Option<ArtifactId>,
    ) -> ArtifactId {
        let mut hasher = Sha256::new();
        hasher.update(origin.tool.as_bytes());
        hasher.update(body.hash_input());
        let digest = hex::encode(hasher.finalize());
        let base = &digest[..12];

        let mut candidate = base.to_string();
        let mut n = 2u32;
        while self.artifact(&ArtifactId::new(&candidate)).is_some() {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }

        let id = ArtifactId::new(candidate);
        self.artifacts.push(Artifact {
            id: id.clone(),
            origin,
            kind,
            body,
            parent,
            created_at: Utc::now(),
        });
        id
    }

    pub fn artifact(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.artifact(id).is_some()
    }

    /// Append an indicator; returns false when an equal entry already
    /// exists (set semantics).
    pub fn add_indicator(&mut self, entry: Indicator) -> bool {
        let key = entry.dedup_key();
        if self.indicators.iter().any(|i| i.dedup_key() == key) {
            return false;
        }
        self.indicators.push(entry);
        true
    }

    pub fn add_attack_link(&mut self, entry: AttackLink) {
        self.attack_chain.push(entry);
    }

    pub fn set_structural_summary(&mut self, summary: BTreeMap<String, u64>) {
        // Seeded once at triage; later calls would clobber evidence.
        if self.structural_summary.is_empty() {
            self.structural_summary = summary;
        }
    }

    /// Compact per-artifact lines for oracle context.
    pub fn artifact_digest(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .map(|a| {
                let loc = match &a.body {
                    ArtifactBody::Inline { content } => format!("inline, {} bytes", content.len()),
                    ArtifactBody::FileRef { path } => format!("file {}", path.display()),
                };
                format!(
                    "{} [{:?}] from {} at step {} ({})",
                    a.id, a.kind, a.origin.tool, a.origin.step, loc
                )
            })
            .collect()
    }
}
