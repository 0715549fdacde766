use std::path::PathBuf;
use std::sync::Arc;

use tessera::decomposition::Decomposition;
use tessera::domain::{DomainDesign, FieldBoundaryKind};
use tessera::error::{ConfigError, DecompositionError};
use tessera::grid::MaxwellSolver;
use tessera::ordering::PatchOrdering;
use tessera::particle::{ParticleBoundary, SpeciesSpec};
use tessera::patches::PatchCollection;
use tessera::setup::Configuration;

#[test]
fn demo_input_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/plasma.yaml");
    let mut config = Configuration::from_file(&path).unwrap();
    config.with_context("constants");

    let domain = Arc::new(config.domain_design().unwrap().build().unwrap());
    assert_eq!(domain.ordering(), PatchOrdering::Hilbert);
    assert_eq!(domain.total_patches(), 64);
    assert!(domain.timestep() < 0.5 / 2f64.sqrt());

    let control = config.control().unwrap();
    assert!(MaxwellSolver::create(&control.solver, domain.dims()).is_ok());
    let species = config.species(domain.dims()).unwrap();
    assert_eq!(species[1].boundaries[1][1], ParticleBoundary::Thermalize { temperature: 0.005 });

    let density = config.density("electron").unwrap();
    assert_eq!(density(0.0, 10.0, 0.0), 1.0);
    assert_eq!(density(0.0, 40.0, 0.0), 0.0);

    let d = Decomposition::even(64, 4).unwrap();
    let patches = PatchCollection::new(domain, d, 2, species, control.species_fields, control.seed).unwrap();
    assert_eq!(patches.hindices(), 32..48);
    assert!(patches.field_kind("Rho_ion").is_ok());
}

#[test]
fn invalid_domains_are_rejected() {
    let split = DomainDesign::new(2).cells(&[30, 32]).patches(&[4, 4]).build();
    assert_eq!(split.err(), Some(DecompositionError::UnevenSplit { axis: 0, cells: 30, patches: 4 }));

    let small = DomainDesign::new(1).cells(&[32]).patches(&[8]).build();
    assert!(matches!(small, Err(DecompositionError::PatchTooSmall { axis: 0, n_space: 4, .. })));

    let hilbert = DomainDesign::new(2).cells(&[48, 48]).patches(&[6, 6]).ordering(PatchOrdering::Hilbert).build();
    assert!(matches!(hilbert, Err(DecompositionError::HilbertShape(_))));

    let half = DomainDesign::new(1)
        .cells(&[32])
        .boundary(0, FieldBoundaryKind::Periodic, FieldBoundaryKind::SilverMuller)
        .build();
    assert_eq!(half.err(), Some(DecompositionError::HalfPeriodic(0)));

    assert_eq!(DomainDesign::new(4).build().err(), Some(DecompositionError::InvalidDimensionality(4)));
    assert!(MaxwellSolver::create("Lehe", 2).is_err());
}

#[test]
fn decompositions_are_checked() {
    let domain = Arc::new(DomainDesign::new(1).cells(&[64]).patches(&[4]).build().unwrap());
    assert!(matches!(Decomposition::even(4, 5), Err(DecompositionError::TooFewPatches { .. })));

    let d = Decomposition::even(4, 2).unwrap();
    let err = PatchCollection::new(Arc::clone(&domain), d.clone(), 2, vec![], false, 0).err();
    assert_eq!(err, Some(DecompositionError::NoSuchRank { rank: 2, ranks: 2 }));

    let wrong = Decomposition::even(8, 2).unwrap();
    assert!(PatchCollection::new(Arc::clone(&domain), wrong, 0, vec![], false, 0).is_err());

    let mut spec = SpeciesSpec::new("electron", 1.0, -1.0);
    spec.boundaries[0] = [ParticleBoundary::Remove; 2];
    let err = PatchCollection::new(domain, d, 0, vec![spec], false, 0).err();
    assert_eq!(err, Some(DecompositionError::ParticleBoundaryMismatch { species: "electron".to_owned(), axis: 0 }));
}

#[test]
fn unknown_names_are_reported() {
    let config = Configuration::from_yaml("
control:
  dims: 1
  cells: 64
  cell_length: 1.0
  patches: 4
  timestep: 0.5
boundaries:
  fields: [absorbing, mirror]
").unwrap();
    match config.domain_design() {
        Err(ConfigError::UnknownVariant { what, value }) => {
            assert_eq!(what, "field boundary");
            assert_eq!(value, "mirror");
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }

    let config = Configuration::from_yaml("
species:
  electron:
    mass: 1.0
    charge: -1.0
    boundaries: bounce
").unwrap();
    assert!(matches!(config.species(1), Err(ConfigError::UnknownVariant { .. })));
    assert!(Configuration::from_file(&PathBuf::from("no/such/file.yaml")).is_err());
}
