use std::path::Path;

use ecotox::error::{PersistenceError, SimulationError};
use ecotox::model::{Flux, Process};
use ecotox::prelude::*;
use ecotox::results::{
    Renderer, RunReport, MODEL_FIGURE, OVERVIEW_FIGURE, PARAMETERS_TABLE, TRAJECTORY_TABLE,
};
use ecotox::simulator::Overview;

/// Records what it was asked to draw and writes small placeholder files.
#[derive(Default)]
struct TextRenderer;

impl Renderer for TextRenderer {
    fn render_model(&self, system: &EquationSystem, path: &Path) -> Result<(), PersistenceError> {
        std::fs::write(path, system.render()).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn render_overview(&self, overview: &Overview, path: &Path) -> Result<(), PersistenceError> {
        let titles: Vec<&str> = overview.panels().iter().map(|p| p.title).collect();
        std::fs::write(path, titles.join("\n")).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn run_in(root: &Path, model: &Model, scope: IdentifierScope) -> RunReport {
    Pipeline::new(ResultStore::new(root), TextRenderer)
        .run(model, 20.0, &SolverSettings::default(), scope)
        .expect("pipeline run")
}

#[test]
fn default_run_produces_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        output: OutputSettings {
            root: dir.path().join("output"),
            ..OutputSettings::default()
        },
        ..RunConfig::default()
    };

    let report = run(&config).expect("default run");
    assert_eq!(
        report.location,
        dir.path().join("output").join(report.id.as_str())
    );
    for name in [MODEL_FIGURE, PARAMETERS_TABLE, OVERVIEW_FIGURE] {
        let path = report.location.join(name);
        assert!(path.is_file(), "missing {name}");
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
    assert!(!report.location.join(TRAJECTORY_TABLE).exists());

    let (t, state) = report.trajectory.last().unwrap();
    assert_eq!(t, 500.0);
    assert_eq!(report.trajectory.len(), 501);
    let (plant, herbivore) = (state[Compartment::Plant], state[Compartment::Herbivore]);
    assert!(herbivore > 0.0);
    assert!(herbivore < plant, "H = {herbivore}, P = {plant}");
    assert!(plant < config.parameters.k);
    for total in report.trajectory.total_contaminant() {
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-8);
    }
}

#[test]
fn identifier_depends_on_structure_only() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = Model::default();
    let reparameterized = Model::builder()
        .parameters(Parameters {
            b: 0.3,
            ..Parameters::default()
        })
        .initial(vec![2.0, 0.0, 0.0, 1.0, 1.0])
        .build()
        .unwrap();

    let first = run_in(dir.path(), &baseline, IdentifierScope::Structure);
    let second = run_in(dir.path(), &reparameterized, IdentifierScope::Structure);
    assert_eq!(first.id, second.id);
    assert_eq!(first.location, second.location);

    // Last writer wins.
    let table = std::fs::read_to_string(second.location.join(PARAMETERS_TABLE)).unwrap();
    assert!(table.lines().nth(1).unwrap().contains("0.3"));

    let extended = Model::builder()
        .system(
            EquationSystem::standard()
                .with_flux(Compartment::Plant, Flux::loss(Process::HerbivoreMortality)),
        )
        .build()
        .unwrap();
    let third = run_in(dir.path(), &extended, IdentifierScope::Structure);
    assert_ne!(first.id, third.id);
    let equations = std::fs::read_to_string(third.location.join(MODEL_FIGURE)).unwrap();
    assert!(equations.starts_with("dC/dt"));
}

#[test]
fn input_scope_separates_parameter_variants() {
    let dir = tempfile::tempdir().unwrap();
    let a = Model::default();
    let b = Model::builder()
        .parameter_values(vec![0.0, 0.0, 0.2, 0.6, 0.1, 0.05, 0.08, 0.08, 0.25, 10.0])
        .build()
        .unwrap();

    let first = run_in(dir.path(), &a, IdentifierScope::StructureAndInputs);
    let second = run_in(dir.path(), &b, IdentifierScope::StructureAndInputs);
    assert_ne!(first.location, second.location);
    assert_eq!(
        first.id,
        RunId::for_scope(&a, IdentifierScope::StructureAndInputs)
    );
    assert!(first.location.join(OVERVIEW_FIGURE).is_file());
    assert!(second.location.join(OVERVIEW_FIGURE).is_file());
}

#[test]
fn trajectory_table_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let report = Pipeline::new(ResultStore::new(dir.path()), TextRenderer)
        .with_trajectory_csv(true)
        .run(
            &Model::default(),
            3.0,
            &SolverSettings::default(),
            IdentifierScope::Structure,
        )
        .unwrap();

    let table = std::fs::read_to_string(report.location.join(TRAJECTORY_TABLE)).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "t,C,C_P,C_H,P,H");
    assert_eq!(lines[1], "0,1,0,0,1,1");
    assert_eq!(lines.len(), 5);
}

#[test]
fn failed_simulation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("output");
    let model = Model::builder()
        .initial(vec![1.0, 0.0, 0.0, 0.0, 1.0])
        .build()
        .unwrap();

    let err = Pipeline::new(ResultStore::new(&root), TextRenderer)
        .run(
            &model,
            500.0,
            &SolverSettings::default(),
            IdentifierScope::Structure,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EcotoxError::Simulation(SimulationError::SingularState { .. })
    ));
    assert!(!root.exists());
}

#[test]
fn configuration_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("run.json");
    let output = dir.path().join("results");
    std::fs::write(
        &config_path,
        format!(
            r#"{{
                "parameters": {{ "theta": 0.01, "mu": 0.01 }},
                "t_max": 10,
                "output": {{ "root": {:?}, "trajectory_csv": true }}
            }}"#,
            output.display().to_string()
        ),
    )
    .unwrap();

    let config = RunConfig::from_json_file(&config_path).unwrap();
    let report = run(&config).unwrap();
    assert!(report.location.starts_with(&output));
    assert_eq!(report.trajectory.len(), 11);
    assert!(report.location.join(TRAJECTORY_TABLE).is_file());
}
