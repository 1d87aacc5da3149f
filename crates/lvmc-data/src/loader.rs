//! Reading setup files from disk.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus the [`load_setup`] / [`load_simulation`] /
//! [`load_simulation_from_dir`] entry points.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::schema::SimulationSetup;
use crate::setup::{SetupError, Simulation, build};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// No setup file with the requested base name exists.
    #[error("no {base_name}.ron/.toml/.json in {dir}")]
    MissingSetup { base_name: String, dir: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The document parsed but does not describe a valid simulation.
    #[error("invalid setup in {file}: {source}")]
    Setup {
        file: PathBuf,
        #[source]
        source: SetupError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a setup file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one exists.
pub fn find_setup_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format).map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Deserialize in-memory text in the given format.
pub fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, String> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

/// Load a [`SimulationSetup`] document.
pub fn load_setup(path: &Path) -> Result<SimulationSetup, DataLoadError> {
    let setup: SimulationSetup = deserialize_file(path)?;
    log::debug!(
        "loaded setup {}: {}x{} lattice",
        path.display(),
        setup.lattice.width,
        setup.lattice.height
    );
    Ok(setup)
}

/// Load a setup document and build it.
pub fn load_simulation(path: &Path) -> Result<Simulation, DataLoadError> {
    let setup = load_setup(path)?;
    build(&setup).map_err(|source| DataLoadError::Setup {
        file: path.to_path_buf(),
        source,
    })
}

/// Find `{base_name}` in `dir` in whichever format is present and build it.
pub fn load_simulation_from_dir(dir: &Path, base_name: &str) -> Result<Simulation, DataLoadError> {
    let path = find_setup_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingSetup {
        base_name: base_name.to_string(),
        dir: dir.to_path_buf(),
    })?;
    load_simulation(&path)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FlowData, OrientationData, PolicyData, PopulationData};
    use lvmc_core::orientation::Orientation;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lvmc_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("setup.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("setup.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("setup.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["setup.yaml", "setup"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_setup_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_setup_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_setup_file(&dir, "setup").unwrap(), None);

        fs::write(dir.join("setup.toml"), "").unwrap();
        assert_eq!(
            find_setup_file(&dir, "setup").unwrap(),
            Some(dir.join("setup.toml"))
        );
        cleanup(&dir);
    }

    #[test]
    fn find_setup_file_conflict() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("setup.ron"), "").unwrap();
        fs::write(dir.join("setup.json"), "").unwrap();
        assert!(matches!(
            find_setup_file(&dir, "setup"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Formats
    // -----------------------------------------------------------------------

    #[test]
    fn toml_setup() {
        let text = r#"
            obstacles = [[0, 0], [1, 0]]

            [lattice]
            width = 12
            height = 8
            seed = 3

            [population.density]
            density = 0.25

            [rates]
            beta = 0.5
            policy = "rotate_and_hop_only"

            [rates.overrides]
            v0 = 2.0

            [flow.poiseuille]
            v1 = 0.8
        "#;
        let setup: SimulationSetup = deserialize_str(text, Format::Toml).unwrap();
        assert_eq!(setup.lattice.width, 12);
        assert_eq!(setup.obstacles, vec![[0, 0], [1, 0]]);
        assert_eq!(setup.population, PopulationData::Density { density: 0.25 });
        assert_eq!(setup.rates.beta, 0.5);
        assert_eq!(setup.rates.v0, 1.0);
        assert_eq!(setup.rates.policy, PolicyData::RotateAndHopOnly);
        assert_eq!(setup.rates.overrides.get("v0"), Some(&2.0));
        assert_eq!(setup.flow, FlowData::Poiseuille { v1: 0.8 });
    }

    #[test]
    fn json_setup_with_defaults() {
        let text = r#"{
            "lattice": { "width": 5, "height": 5 },
            "population": { "region": {
                "x_min": 0, "x_max": 4, "y_min": 2, "y_max": 2,
                "orientation": "left", "n": 3
            } },
            "flow": { "uniform": { "vx": 1.0, "vy": 0.0 } }
        }"#;
        let setup: SimulationSetup = deserialize_str(text, Format::Json).unwrap();
        assert_eq!(setup.lattice.seed, 0);
        assert!(setup.sinks.is_empty());
        assert_eq!(setup.rates.beta, 1.0);
        assert!(matches!(
            setup.population,
            PopulationData::Region {
                orientation: Some(OrientationData::Left),
                n: 3,
                ..
            }
        ));
    }

    #[test]
    fn ron_setup_with_spins() {
        let text = r#"(
            lattice: (width: 3, height: 2),
            sinks: [(2, 1)],
            population: spins(rows: ["^>.", "<v."]),
        )"#;
        let setup: SimulationSetup = deserialize_str(text, Format::Ron).unwrap();
        assert_eq!(setup.sinks, vec![[2, 1]]);
        assert_eq!(setup.flow, FlowData::None);
        let sim = build(&setup).unwrap();
        assert_eq!(sim.lattice.n_particles(), 4);
        assert_eq!(sim.lattice.get_particle_orientation(1, 1).unwrap(), Orientation::Down);
    }

    // -----------------------------------------------------------------------
    // load_setup / load_simulation
    // -----------------------------------------------------------------------

    #[test]
    fn load_simulation_from_file() {
        let dir = make_test_dir("load");
        let path = dir.join("setup.toml");
        fs::write(
            &path,
            "[lattice]\nwidth = 10\nheight = 10\n\n[population.density]\ndensity = 0.3\n",
        )
        .unwrap();

        let sim = load_simulation(&path).unwrap();
        assert_eq!(sim.lattice.n_particles(), 30);
        assert!(sim.rates.total_propensity() > 0.0);
        cleanup(&dir);
    }

    #[test]
    fn load_reports_parse_and_setup_errors() {
        let dir = make_test_dir("errors");

        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            load_setup(&broken),
            Err(DataLoadError::Parse { .. })
        ));

        let invalid = dir.join("invalid.toml");
        fs::write(
            &invalid,
            "[lattice]\nwidth = 4\nheight = 4\n\n[population.density]\ndensity = 2.0\n",
        )
        .unwrap();
        assert!(matches!(
            load_simulation(&invalid),
            Err(DataLoadError::Setup { .. })
        ));

        assert!(matches!(
            load_setup(&dir.join("missing.ron")),
            Err(DataLoadError::Io(_))
        ));
        cleanup(&dir);
    }

    #[test]
    fn load_simulation_from_dir_picks_present_format() {
        let dir = make_test_dir("from_dir");
        fs::write(
            dir.join("run.ron"),
            "(lattice: (width: 4, height: 3), population: spins(rows: [\"^^^^\", \"....\", \">>..\"]))",
        )
        .unwrap();

        let sim = load_simulation_from_dir(&dir, "run").unwrap();
        assert_eq!(sim.lattice.n_particles(), 6);

        assert!(matches!(
            load_simulation_from_dir(&dir, "other"),
            Err(DataLoadError::MissingSetup { .. })
        ));

        fs::write(dir.join("run.json"), "{}").unwrap();
        assert!(matches!(
            load_simulation_from_dir(&dir, "run"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }
}
