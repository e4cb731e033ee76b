use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use vizij_rig_core::MocAsset;

pub mod solver;

pub use solver::{
    DrawableDef, Driver, FixtureLoader, FixtureModel, FixtureMoc, ParameterDef, PartDef, RigDefinition,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    rigs: HashMap<String, RigEntry>,
    #[serde(default)]
    configs: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RigEntry {
    Path(String),
    Detailed { path: String },
}

impl RigEntry {
    fn as_path(&self) -> &str {
        match self {
            RigEntry::Path(path) => path,
            RigEntry::Detailed { path } => path,
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path).with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name).ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod rigs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.rigs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.rigs, "rig", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load(name: &str) -> Result<RigDefinition> {
        let entry = lookup(&MANIFEST.rigs, "rig", name)?;
        super::load_json(entry.as_path())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.rigs, "rig", name)?;
        Ok(resolve_path(entry.as_path()))
    }

    /// Compiled moc bytes understood by [`FixtureLoader`].
    pub fn moc_bytes(name: &str) -> Result<Vec<u8>> {
        Ok(json(name)?.into_bytes())
    }

    /// A moc asset backed by the fixture solver.
    pub fn moc(name: &str) -> Result<MocAsset> {
        let bytes = moc_bytes(name)?;
        MocAsset::from_bytes(name, bytes, Arc::new(FixtureLoader))
            .with_context(|| format!("failed to wrap rig fixture '{name}'"))
    }
}

pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.configs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        super::load_json(rel)
    }
}
